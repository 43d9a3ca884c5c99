use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use threadlog::cli::{Cli, Commands};
use threadlog::{utils, ConversationStore, Message, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            utils::print_failure(&failure_report(&e));
            ExitCode::FAILURE
        }
    }
}

/// Whole context chain on one line, outermost first
fn failure_report(error: &anyhow::Error) -> String {
    format!("{:#}", error)
}

async fn run() -> Result<()> {
    let mut settings = Settings::new().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Some(root) = cli.root {
        settings.storage.root = root;
    }

    let store = ConversationStore::open(&settings.storage)
        .await
        .with_context(|| format!("Failed to open store at {:?}", settings.storage.root))?;

    match cli.command {
        Commands::Threads { user } => handle_threads(&store, &user).await,
        Commands::Users => handle_users(&store).await,
        Commands::Show { user, thread } => handle_show(&store, &user, &thread).await,
        Commands::Append { user, thread, content, role } => {
            handle_append(&store, &user, &thread, Message::new(role, content)).await
        }
        Commands::Delete { user, thread } => handle_delete(&store, &user, &thread).await,
    }
}

async fn handle_threads(store: &ConversationStore, user: &str) -> Result<()> {
    let threads = store.list_threads(user).await;
    utils::print_names(&format!("Threads for {}", user), &threads, "no threads yet");
    Ok(())
}

async fn handle_users(store: &ConversationStore) -> Result<()> {
    let users = store.list_users().await;
    utils::print_names("Users", &users, "no conversations stored");
    Ok(())
}

async fn handle_show(store: &ConversationStore, user: &str, thread: &str) -> Result<()> {
    let messages = store.get_conversation(user, thread).await;

    utils::print_thread_header(user, thread);
    if messages.is_empty() {
        utils::print_skipped("empty conversation");
    }
    for message in &messages {
        utils::print_message(message);
    }
    Ok(())
}

async fn handle_append(store: &ConversationStore, user: &str, thread: &str, message: Message) -> Result<()> {
    let count = store
        .append_message(user, thread, message.stamped())
        .await
        .context("Failed to append message")?;

    utils::print_stored(&format!("{} / {} now has {} messages", user, thread, count));
    Ok(())
}

async fn handle_delete(store: &ConversationStore, user: &str, thread: &str) -> Result<()> {
    let deleted = store
        .delete_conversation(user, thread)
        .await
        .context("Failed to delete conversation")?;

    if deleted {
        utils::print_stored(&format!("deleted {} / {}", user, thread));
    } else {
        utils::print_skipped(&format!("nothing stored for {} / {}", user, thread));
    }
    Ok(())
}
