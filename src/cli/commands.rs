use crate::core::Role;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "threadlog")]
#[command(author, version, about = "Inspect and edit stored conversation threads", long_about = None)]
pub struct Cli {
    /// Storage root (overrides configuration)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the threads of a user
    Threads { user: String },

    /// List every user with stored conversations
    Users,

    /// Print the messages of a thread
    Show { user: String, thread: String },

    /// Append one message to a thread, creating it if needed
    Append {
        user: String,
        thread: String,
        content: String,

        #[arg(short, long, default_value = "user")]
        role: Role,
    },

    /// Delete a thread
    Delete { user: String, thread: String },
}
