//! CLI command handlers

use anyhow::Result;
use clap_complete::generate;
use colored::Colorize;
use std::io;
use std::sync::Arc;

use crate::config::Config;
use crate::download::RunEngine;
use crate::store::{JsonCacheStore, JsonQueueStore, QueueStore};
use crate::ytdlp::YtDlp;

/// Handle `queue add`
pub async fn queue_add(config: &Config, user: &str, urls: Vec<String>) -> Result<()> {
    let store = JsonQueueStore::new(config.queues_root());

    let requested = urls.len();
    let added = store.append(user, &urls).await?;
    let skipped = requested - added;

    println!("{} URL(s) added to the queue.", added.to_string().green());
    if skipped > 0 {
        println!(
            "{} URL(s) skipped (empty, too long, or already queued).",
            skipped.to_string().yellow()
        );
    }
    println!("Run {} to download.", format!("tunedrop run {user}").cyan());

    Ok(())
}

/// Handle `queue list`
pub async fn queue_list(config: &Config, user: &str) -> Result<()> {
    let store = JsonQueueStore::new(config.queues_root());
    let urls = store.load(user).await?;

    if urls.is_empty() {
        println!("{}", "Queue is empty.".yellow());
        return Ok(());
    }

    println!("{} pending URL(s):", urls.len().to_string().green().bold());
    for (index, url) in urls.iter().enumerate() {
        println!("  {:>3}. {}", index + 1, url);
    }

    Ok(())
}

/// Handle `queue clear`
pub async fn queue_clear(config: &Config, user: &str) -> Result<()> {
    let store = JsonQueueStore::new(config.queues_root());
    let pending = store.load(user).await?.len();
    store.replace(user, &[]).await?;

    println!("Cleared {} pending URL(s).", pending.to_string().green());
    Ok(())
}

/// Handle the `run` command
pub async fn run(config: Config, user: &str, workers: usize) -> Result<()> {
    let extractor = Arc::new(YtDlp::new(config.ytdlp_bin.clone()));
    let queue = Arc::new(JsonQueueStore::new(config.queues_root()));
    let cache = Arc::new(JsonCacheStore::new(config.downloads_root()));

    let engine = RunEngine::new(config, extractor, queue, cache);
    let report = engine.run(user, workers).await?;

    println!();
    println!("{}", "Run complete!".green().bold());
    println!("  Downloaded: {}", report.downloaded.to_string().green());
    println!("  Duplicates: {}", report.duplicates.to_string().yellow());
    println!("  Errors:     {}", report.errors.to_string().red());

    if !report.failed.is_empty() {
        println!();
        println!("{}", "Failed entries:".red().bold());
        for failed in &report.failed {
            println!(
                "  {} - {} ({} attempt(s))",
                failed.title, failed.artist, failed.attempts
            );
            println!("    URL:    {}", failed.url);
            println!("    Reason: {}", failed.reason);
        }
    }

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "tunedrop", &mut io::stdout());
}

// Extension trait for Cli to get clap Command
impl super::Cli {
    fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}
