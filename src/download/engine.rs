//! Run coordination
//!
//! One run processes a user's queue snapshot exactly once: disk-space
//! precheck, parallel metadata resolution, playlist expansion, sequential
//! deduplication against the pre-run cache snapshot, parallel download
//! execution, a single cache flush, and an unconditional queue clear.
//! Entry-level failures never abort sibling entries; the run returns a
//! summary instead of an error except when the queue store itself fails.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::Config;
use crate::download::dedup::filter_duplicates;
use crate::download::worker::{self, WorkerContext};
use crate::download::{FailedEntry, MediaEntry, RunReport};
use crate::store::{CacheStore, QueueStore, SongCache};
use crate::utils::{disk, shorten, urls};
use crate::ytdlp::{ExtractorError, MediaExtractor, Resolved, ResolveOptions};

/// Cap on expanded playlist children
const PLAYLIST_CHILD_CAP: u32 = 150;

/// Cap on failure reason text carried in the summary
const MAX_DIAG_LEN: usize = 600;

/// Coordinates one pipeline run per invocation
pub struct RunEngine {
    config: Config,
    extractor: Arc<dyn MediaExtractor>,
    queue: Arc<dyn QueueStore>,
    cache_store: Arc<dyn CacheStore>,
}

impl RunEngine {
    pub fn new(
        config: Config,
        extractor: Arc<dyn MediaExtractor>,
        queue: Arc<dyn QueueStore>,
        cache_store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            config,
            extractor,
            queue,
            cache_store,
        }
    }

    /// Process the user's queue snapshot once
    ///
    /// Always leaves the queue empty afterwards, whatever the outcome of
    /// individual entries. Only a queue-store failure (or an invalid
    /// user) escapes as an error.
    pub async fn run(&self, user: &str, workers: usize) -> Result<RunReport> {
        let workers = workers.max(1);
        let out_dir = self.config.user_output_dir(user)?;
        let cover_dir = self.config.user_cover_dir(user)?;

        let queued = self.queue.load(user).await?;
        if queued.is_empty() {
            info!(user, step = "queue", "No URLs in queue");
            return Ok(RunReport::default());
        }

        if !disk::has_free_space(&out_dir, self.config.min_free_mb) {
            warn!(user, step = "queue", "Insufficient disk space, aborting run");
            self.queue.replace(user, &[]).await?;
            return Ok(RunReport {
                errors: 1,
                failed: vec![FailedEntry::placeholder("—", "Insufficient disk space")],
                ..Default::default()
            });
        }

        info!(user, step = "queue", "Starting run over {} URL(s)", queued.len());

        // Pre-run cache snapshot; a lost cache means re-downloads, not a
        // failed run
        let cache_snapshot = match self.cache_store.load(user).await {
            Ok(records) => SongCache::from_records(records),
            Err(e) => {
                warn!(user, "Failed to load song cache: {e:#}");
                SongCache::default()
            }
        };

        // Phase 1: metadata resolution, order-preserving so per-URL errors
        // pair with their source URL
        let cookies = self.config.cookies_file();
        let meta_results: Vec<(String, Result<Resolved, ExtractorError>)> =
            stream::iter(queued)
                .map(|url| {
                    let extractor = self.extractor.clone();
                    let cookies = cookies.clone();
                    async move {
                        let result = resolve_url(extractor.as_ref(), &url, cookies).await;
                        (url, result)
                    }
                })
                .buffered(workers)
                .collect()
                .await;

        let mut failed_meta: Vec<FailedEntry> = Vec::new();
        let mut entries: Vec<MediaEntry> = Vec::new();
        for (src_url, result) in meta_results {
            match result {
                Ok(resolved) => expand(resolved, &mut entries),
                Err(e) => {
                    warn!(user, step = "metadata", url = %src_url, "Metadata error: {e}");
                    failed_meta.push(FailedEntry::placeholder(
                        &src_url,
                        shorten(&e.detail(), MAX_DIAG_LEN),
                    ));
                }
            }
        }

        let (entries, dup_count) = filter_duplicates(entries, &cache_snapshot, &out_dir);

        if entries.is_empty() {
            let errors = failed_meta.len();
            self.queue.replace(user, &[]).await?;
            if errors > 0 {
                warn!(user, step = "metadata", "{} error(s) already in metadata phase", errors);
            } else {
                info!(user, step = "metadata", "Only duplicates or empty results, nothing to do");
            }
            return Ok(RunReport {
                downloaded: 0,
                duplicates: dup_count,
                errors,
                failed: failed_meta,
            });
        }

        // Phase 2: download execution; completion order, independent tasks
        let ctx = WorkerContext {
            extractor: self.extractor.clone(),
            out_dir,
            cover_dir,
            cookies,
            ffmpeg_bin: self.config.ffmpeg_bin.clone(),
        };
        let cache = Arc::new(Mutex::new(cache_snapshot));
        let total = entries.len();
        let done = AtomicUsize::new(0);

        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let results: Vec<Result<(), FailedEntry>> = stream::iter(entries)
            .map(|entry| {
                let ctx = ctx.clone();
                let cache = cache.clone();
                let progress = &progress;
                let done = &done;
                async move {
                    let outcome = worker::process_entry(&ctx, &entry).await;
                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.inc(1);

                    match outcome {
                        Ok(record) => {
                            // Single post-completion insert per entry
                            let mut guard = cache.lock().unwrap_or_else(|p| p.into_inner());
                            guard.insert(record);
                            drop(guard);

                            progress.set_message(entry.title.clone());
                            info!(user, step = "download", "Progress: {finished}/{total}");
                            Ok(())
                        }
                        Err(failed) => {
                            warn!(
                                user,
                                step = "download",
                                vid = ?entry.id,
                                "Error in entry {finished}/{total}: {}",
                                failed.reason
                            );
                            Err(failed)
                        }
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        progress.finish_with_message("Downloads complete");

        let mut downloaded = 0;
        let mut failed: Vec<FailedEntry> = failed_meta;
        for result in results {
            match result {
                Ok(()) => downloaded += 1,
                Err(f) => failed.push(f),
            }
        }

        // Best-effort flush; produced files outlive a failed save
        let records = cache.lock().unwrap_or_else(|p| p.into_inner()).records();
        if let Err(e) = self.cache_store.save(user, &records).await {
            warn!(user, "Failed to save song cache: {e:#}");
        }

        self.queue.replace(user, &[]).await?;

        let errors = failed.len();
        if errors > 0 {
            warn!(user, step = "download", "{} error(s) occurred", errors);
        }

        Ok(RunReport {
            downloaded,
            duplicates: dup_count,
            errors,
            failed,
        })
    }
}

/// Classify the URL shape and resolve it through the extraction tool
async fn resolve_url(
    extractor: &dyn MediaExtractor,
    url: &str,
    cookies: Option<std::path::PathBuf>,
) -> Result<Resolved, ExtractorError> {
    let playlist = urls::is_playlist_url(url);
    let effective = if playlist {
        url.to_string()
    } else {
        urls::strip_playlist_context(url)
    };

    let opts = ResolveOptions {
        playlist,
        playlist_end: PLAYLIST_CHILD_CAP,
        cookies,
    };
    extractor.resolve(&effective, &opts).await
}

/// Expand resolved metadata into media entries
///
/// Playlists contribute one entry per non-null child; anything else
/// contributes exactly one entry.
fn expand(resolved: Resolved, entries: &mut Vec<MediaEntry>) {
    match resolved.entries {
        Some(children) => {
            for child in children.into_iter().flatten() {
                match MediaEntry::from_item(child) {
                    Some(entry) => entries.push(entry),
                    None => warn!("Dropping playlist child without a usable URL"),
                }
            }
        }
        None => match MediaEntry::from_item(resolved.item) {
            Some(entry) => entries.push(entry),
            None => warn!("Dropping resolved item without a usable URL"),
        },
    }
}
