//! Per-entry download execution
//!
//! Each entry moves through: attempt 1 with standard options, an optional
//! attempt 2 with the alternate client identity when the first failure
//! matches the blocked-access signal set, then rename-by-prefix commit,
//! tagging, and cover acquisition. Tagging and cover failures are logged
//! but never fail the entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::cover;
use crate::download::classify::classify;
use crate::download::{FailedEntry, MediaEntry};
use crate::store::SongRecord;
use crate::tags;
use crate::utils::shorten;
use crate::ytdlp::{DownloadOptions, ExtractorError, MediaExtractor};

/// Backoff before the alternate-client retry
const RETRY_BACKOFF: Duration = Duration::from_millis(800);

/// Client identity used to bypass blocked-access responses
const ALT_CLIENT: &str = "android";

/// Cap on failure reason / stderr text carried in results
const MAX_DIAG_LEN: usize = 600;

/// Everything a download worker needs besides the entry itself
#[derive(Clone)]
pub struct WorkerContext {
    pub extractor: Arc<dyn MediaExtractor>,
    pub out_dir: PathBuf,
    pub cover_dir: PathBuf,
    pub cookies: Option<PathBuf>,
    pub ffmpeg_bin: PathBuf,
}

/// Download, commit, tag, and fetch the cover for one entry
///
/// Returns the song record to merge into the cache, or the failure to
/// tally. Sibling entries are unaffected either way.
pub async fn process_entry(
    ctx: &WorkerContext,
    entry: &MediaEntry,
) -> Result<SongRecord, FailedEntry> {
    // Collision-resistant temp prefix; the rename below strips it
    let prefix = format!("{:08x}", rand::random::<u32>());
    let template = ctx
        .out_dir
        .join(format!("{prefix}_{}.%(ext)s", entry.file_stem()));

    let base_opts = DownloadOptions {
        output_template: template,
        cookies: ctx.cookies.clone(),
        ffmpeg_location: Some(ctx.ffmpeg_bin.clone()),
        client_override: None,
    };

    let mut attempts = 1;
    if let Err(first) = ctx.extractor.download(&entry.url, &base_opts).await {
        let Some(signal) = classify(&first.detail()) else {
            return Err(failure(entry, &first, attempts));
        };

        debug!(vid = ?entry.id, ?signal, "Blocked-access signal, retrying with {ALT_CLIENT} client");
        sleep(RETRY_BACKOFF).await;

        attempts = 2;
        let retry_opts = DownloadOptions {
            client_override: Some(ALT_CLIENT.to_string()),
            ..base_opts
        };
        if let Err(second) = ctx.extractor.download(&entry.url, &retry_opts).await {
            return Err(failure(entry, &second, attempts));
        }
    }

    // Commit: every artifact sharing the temp prefix becomes final
    let finals = match commit_artifacts(&ctx.out_dir, &prefix) {
        Ok(paths) => paths,
        Err(e) => {
            return Err(FailedEntry {
                title: entry.title.clone(),
                artist: entry.uploader.clone(),
                url: entry.url.clone(),
                reason: shorten(&format!("rename failed: {e}"), MAX_DIAG_LEN),
                attempts,
            });
        }
    };

    for path in &finals {
        if let Err(e) = tags::write_tags(path, entry) {
            warn!("Tagging error for {}: {e:#}", path.display());
        }
    }

    let cover = match cover::save_cover(
        ctx.extractor.as_ref(),
        entry,
        &ctx.cover_dir,
        &ctx.ffmpeg_bin,
        ctx.cookies.as_deref(),
    )
    .await
    {
        Ok(cover) => cover,
        Err(e) => {
            warn!(vid = ?entry.id, "Could not save cover: {e:#}");
            None
        }
    };

    Ok(entry.clone().into_record(cover))
}

fn failure(entry: &MediaEntry, error: &ExtractorError, attempts: u32) -> FailedEntry {
    let detail = error.detail();
    warn!(vid = ?entry.id, "Download failed: {}", shorten(&detail, MAX_DIAG_LEN));
    FailedEntry {
        title: entry.title.clone(),
        artist: entry.uploader.clone(),
        url: entry.url.clone(),
        reason: shorten(&detail, MAX_DIAG_LEN),
        attempts,
    }
}

/// Rename every file carrying the temporary prefix to its final name
///
/// Post-processing can yield several artifacts per entry; all of them are
/// committed in one pass.
fn commit_artifacts(out_dir: &Path, prefix: &str) -> std::io::Result<Vec<PathBuf>> {
    let marker = format!("{prefix}_");
    let mut finals = Vec::new();

    for dirent in std::fs::read_dir(out_dir)?.flatten() {
        let name = dirent.file_name().to_string_lossy().into_owned();
        let Some(final_name) = name.strip_prefix(&marker) else {
            continue;
        };

        let final_path = out_dir.join(final_name);
        std::fs::rename(dirent.path(), &final_path)?;
        debug!("Committed {}", final_path.display());
        finals.push(final_path);
    }

    Ok(finals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ytdlp::{Resolved, ResolveOptions};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Extractor stub: blocked on the first download call, fine afterwards
    struct BlockedOnceExtractor {
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl MediaExtractor for BlockedOnceExtractor {
        async fn resolve(
            &self,
            _url: &str,
            _opts: &ResolveOptions,
        ) -> Result<Resolved, ExtractorError> {
            Err(ExtractorError::Empty)
        }

        async fn download(
            &self,
            _url: &str,
            _opts: &DownloadOptions,
        ) -> Result<(), ExtractorError> {
            if self.downloads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ExtractorError::Failed {
                    message: "yt-dlp exited with exit status: 1".to_string(),
                    stderr: "HTTP Error 403: Forbidden".to_string(),
                });
            }
            Ok(())
        }

        async fn fetch_thumbnail(
            &self,
            _url: &str,
            _output_template: &Path,
            _cookies: Option<&Path>,
        ) -> Result<(), ExtractorError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_commit_failure_reports_retry_attempt_count() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = WorkerContext {
            extractor: Arc::new(BlockedOnceExtractor {
                downloads: AtomicUsize::new(0),
            }),
            // A missing output directory makes the commit step fail
            out_dir: tmp.path().join("missing"),
            cover_dir: tmp.path().to_path_buf(),
            cookies: None,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        };
        let entry = MediaEntry {
            id: Some("abc".to_string()),
            title: "T".to_string(),
            uploader: "A".to_string(),
            url: "https://example.com/x".to_string(),
            album: None,
            upload_date: None,
            description: String::new(),
        };

        let err = process_entry(&ctx, &entry).await.unwrap_err();
        assert_eq!(err.attempts, 2);
        assert!(err.reason.contains("rename failed"));
    }

    #[test]
    fn test_commit_renames_all_prefixed_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("aa11bb22_Song # Artist.opus"), b"a").unwrap();
        std::fs::write(tmp.path().join("aa11bb22_Song # Artist.webp"), b"t").unwrap();
        std::fs::write(tmp.path().join("unrelated.opus"), b"x").unwrap();

        let mut finals = commit_artifacts(tmp.path(), "aa11bb22").unwrap();
        finals.sort();

        assert_eq!(
            finals,
            vec![
                tmp.path().join("Song # Artist.opus"),
                tmp.path().join("Song # Artist.webp"),
            ]
        );
        assert!(tmp.path().join("unrelated.opus").exists());
        assert!(!tmp.path().join("aa11bb22_Song # Artist.opus").exists());
    }

    #[test]
    fn test_commit_with_no_artifacts_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(commit_artifacts(tmp.path(), "deadbeef").unwrap().is_empty());
    }
}
