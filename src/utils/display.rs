use crate::core::{Message, Role};
use colored::*;

/// `alice / trip` heading followed by an underline of the same width
pub fn print_thread_header(user: &str, thread: &str) {
    let title = format!("{} / {}", user, thread);
    println!("\n{}", title.bright_cyan().bold());
    println!("{}", "-".repeat(title.chars().count()).bright_cyan());
}

/// Titled list of names, or `empty_note` when there are none
pub fn print_names(title: &str, names: &[String], empty_note: &str) {
    println!("\n{} ({})", title.bright_cyan().bold(), names.len());
    if names.is_empty() {
        println!("  {}", empty_note.dimmed());
    }
    for name in names {
        println!("  {}", name);
    }
}

pub fn print_stored(text: &str) {
    println!("{} {}", "stored".green().bold(), text);
}

pub fn print_skipped(text: &str) {
    println!("{} {}", "skipped".yellow().bold(), text);
}

pub fn print_failure(report: &str) {
    eprintln!("{} {}", "error:".red().bold(), report);
}

pub fn print_message(message: &Message) {
    let role = match message.role {
        Role::User => message.role.as_str().yellow().bold(),
        Role::Assistant => message.role.as_str().green().bold(),
        Role::System => message.role.as_str().magenta().bold(),
    };

    match &message.timestamp {
        Some(ts) => println!("{} {}: {}", ts.dimmed(), role, message.content),
        None => println!("{}: {}", role, message.content),
    }
}
