//! CLI module for tunedrop

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

use crate::config::DEFAULT_WORKERS;

#[derive(Parser, Debug)]
#[command(name = "tunedrop", about = "Queue media URLs and download them as tagged audio")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory for queues, downloads and covers
    #[arg(long, global = true, env = "TUNEDROP_DATA_ROOT", value_name = "DIR")]
    pub data_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage a user's pending URL queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },

    /// Download everything in a user's queue
    Run {
        /// Numeric user identifier
        #[arg(value_name = "USER")]
        user: String,

        /// Number of parallel workers
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// Add URLs to the queue
    Add {
        /// Numeric user identifier
        #[arg(value_name = "USER")]
        user: String,

        /// URLs to enqueue
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// Show the pending queue
    List {
        /// Numeric user identifier
        #[arg(value_name = "USER")]
        user: String,
    },

    /// Remove all pending URLs
    Clear {
        /// Numeric user identifier
        #[arg(value_name = "USER")]
        user: String,
    },
}
