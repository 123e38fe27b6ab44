//! Per-user pending URL queues
//!
//! A queue is an ordered list of remote URLs awaiting one processing
//! attempt. Storage failures are fatal to the caller: a run cannot decide
//! anything sensible when it does not know what is queued.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use crate::utils::{sanitize_user_id, urls::MAX_URL_LEN};

/// Storage contract for pending URL queues
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Load the ordered queue for a user; a user with no queue yet is empty
    async fn load(&self, user: &str) -> Result<Vec<String>>;

    /// Replace the entire queue for a user
    async fn replace(&self, user: &str, urls: &[String]) -> Result<()>;

    /// Append new URLs, skipping empties, over-long URLs, and URLs already
    /// queued (verbatim string match). Returns the number appended.
    async fn append(&self, user: &str, urls: &[String]) -> Result<usize>;
}

/// Queue store persisting one JSON array per user under `queues/`
pub struct JsonQueueStore {
    root: PathBuf,
}

impl JsonQueueStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn queue_path(&self, user: &str) -> Result<PathBuf> {
        let user = sanitize_user_id(user)?;
        Ok(self.root.join(format!("{user}.json")))
    }
}

#[async_trait]
impl QueueStore for JsonQueueStore {
    async fn load(&self, user: &str) -> Result<Vec<String>> {
        let path = self.queue_path(user)?;
        if !path.exists() {
            debug!("No queue file at {}", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read queue file {}", path.display()))?;
        let urls: Vec<String> =
            serde_json::from_str(&content).context("Failed to parse queue file")?;

        debug!("Loaded {} queued URL(s) for user {}", urls.len(), user);
        Ok(urls)
    }

    async fn replace(&self, user: &str, urls: &[String]) -> Result<()> {
        let path = self.queue_path(user)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create queue directory {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(urls).context("Failed to serialize queue")?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write queue file {}", path.display()))?;
        Ok(())
    }

    async fn append(&self, user: &str, urls: &[String]) -> Result<usize> {
        let mut queue = self.load(user).await?;

        let mut added = 0;
        for url in urls {
            let url = url.trim();
            if url.is_empty() || url.len() > MAX_URL_LEN {
                continue;
            }
            if queue.iter().any(|queued| queued == url) {
                continue;
            }
            queue.push(url.to_string());
            added += 1;
        }

        if added > 0 {
            self.replace(user, &queue).await?;
            info!(user, "{} URL(s) added to queue", added);
        }
        info!(user, "{} URL(s) in queue", queue.len());

        Ok(added)
    }
}
