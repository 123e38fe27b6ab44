//! Persistent record of already-completed songs
//!
//! The cache is the source of truth for "already downloaded". It is loaded
//! once per run, updated in memory as entries complete, and flushed once at
//! run end. Keys are the media id when known, else `title|artist`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::utils::sanitize_user_id;

const CACHE_FILE: &str = "song-list.json";

/// One completed download
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongRecord {
    /// Media id from the source site, when the extractor reported one
    pub id: Option<String>,
    pub title: String,
    pub artist: String,
    /// Canonical source URL
    pub url: String,
    /// Upload date (ISO), when known
    pub date: Option<String>,
    /// Stored cover filename under the user's cover directory
    pub cover: Option<String>,
}

impl SongRecord {
    /// Identity used to decide "already downloaded"
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}|{}", self.title, self.artist),
        }
    }
}

/// In-memory view of a user's song cache
#[derive(Debug, Default)]
pub struct SongCache {
    records: HashMap<String, SongRecord>,
}

impl SongCache {
    pub fn from_records(records: Vec<SongRecord>) -> Self {
        let mut map = HashMap::with_capacity(records.len());
        for record in records {
            // At most one record per key; the last loaded record wins
            map.insert(record.key(), record);
        }
        Self { records: map }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn insert(&mut self, record: SongRecord) {
        self.records.insert(record.key(), record);
    }

    pub fn records(&self) -> Vec<SongRecord> {
        self.records.values().cloned().collect()
    }
}

/// Storage contract for song caches
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, user: &str) -> Result<Vec<SongRecord>>;
    async fn save(&self, user: &str, records: &[SongRecord]) -> Result<()>;
}

/// Cache store persisting `song-list.json` in each user's output directory
pub struct JsonCacheStore {
    downloads_root: PathBuf,
}

impl JsonCacheStore {
    pub fn new(downloads_root: PathBuf) -> Self {
        Self { downloads_root }
    }

    fn cache_path(&self, user: &str) -> Result<PathBuf> {
        let user = sanitize_user_id(user)?;
        Ok(self.downloads_root.join(user).join(CACHE_FILE))
    }
}

#[async_trait]
impl CacheStore for JsonCacheStore {
    async fn load(&self, user: &str) -> Result<Vec<SongRecord>> {
        let path = self.cache_path(user)?;
        if !path.exists() {
            debug!("No song cache at {}", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read song cache {}", path.display()))?;
        let records: Vec<SongRecord> =
            serde_json::from_str(&content).context("Failed to parse song cache")?;

        debug!("Loaded {} cached song(s) for user {}", records.len(), user);
        Ok(records)
    }

    async fn save(&self, user: &str, records: &[SongRecord]) -> Result<()> {
        let path = self.cache_path(user)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
        }

        let content =
            serde_json::to_string_pretty(records).context("Failed to serialize song cache")?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write song cache {}", path.display()))?;

        debug!("Saved {} song(s) to {}", records.len(), path.display());
        Ok(())
    }
}
