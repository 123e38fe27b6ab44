//! Cover art acquisition and normalization
//!
//! Fetches the thumbnail artifact for an entry into the user's cover
//! directory as `<id>.<ext>` and converts it to the canonical `.jpg`
//! format via ffmpeg. A conversion failure keeps the original-format file,
//! which is still usable by consumers that accept other formats.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::download::MediaEntry;
use crate::ytdlp::MediaExtractor;

/// Bound on the ffmpeg conversion step
const CONVERT_TIMEOUT: Duration = Duration::from_secs(15);

/// Extensions the tool may produce for a thumbnail, in probe order
const THUMBNAIL_EXTS: &[&str] = &["webp", "png", "jpeg", "jpg"];

/// Fetch and normalize the cover for an entry
///
/// Returns the stored filename under `cover_dir`, or `None` when the entry
/// has no usable id or no thumbnail could be obtained. An already-present
/// cover for the id is reused without any extraction call.
pub async fn save_cover(
    extractor: &dyn MediaExtractor,
    entry: &MediaEntry,
    cover_dir: &Path,
    ffmpeg_bin: &Path,
    cookies: Option<&Path>,
) -> Result<Option<String>> {
    let Some(id) = &entry.id else {
        return Ok(None);
    };
    if id.contains('/') || id.contains('\\') || id.contains("..") {
        warn!("Invalid video id for cover: {}", id);
        return Ok(None);
    }

    let final_path = cover_dir.join(format!("{id}.jpg"));
    if final_path.exists() {
        return Ok(file_name(&final_path));
    }
    for ext in ["jpeg", "png", "webp"] {
        let existing = cover_dir.join(format!("{id}.{ext}"));
        if existing.exists() {
            return Ok(file_name(&existing));
        }
    }

    let template = cover_dir.join(format!("{id}.%(ext)s"));
    extractor
        .fetch_thumbnail(&entry.url, &template, cookies)
        .await?;

    let Some(fetched) = find_thumbnail(cover_dir, id) else {
        warn!(vid = %id, "No thumbnail file found after fetch");
        return Ok(None);
    };

    if fetched.extension().and_then(|e| e.to_str()) == Some("jpg") {
        return Ok(file_name(&fetched));
    }

    info!(vid = %id, "Converting cover {} to .jpg", fetched.display());
    match convert_to_jpg(ffmpeg_bin, &fetched, &final_path).await {
        Ok(()) => {
            let _ = std::fs::remove_file(&fetched);
            Ok(file_name(&final_path))
        }
        Err(e) => {
            // Conversion is best-effort; the original format still works
            warn!(vid = %id, "Cover conversion failed: {}", e);
            Ok(file_name(&fetched))
        }
    }
}

fn find_thumbnail(cover_dir: &Path, id: &str) -> Option<PathBuf> {
    THUMBNAIL_EXTS
        .iter()
        .map(|ext| cover_dir.join(format!("{id}.{ext}")))
        .find(|candidate| candidate.exists())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

async fn convert_to_jpg(ffmpeg_bin: &Path, input: &Path, output: &Path) -> Result<()> {
    let mut command = Command::new(ffmpeg_bin);
    command
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-v", "quiet", "-q:v", "2"])
        .arg(output)
        .kill_on_drop(true);

    let result = tokio::time::timeout(CONVERT_TIMEOUT, command.output()).await;
    match result {
        Ok(Ok(output_status)) if output_status.status.success() && output.exists() => {
            debug!("Converted cover to {}", output.display());
            Ok(())
        }
        Ok(Ok(output_status)) => bail!("ffmpeg exited with {}", output_status.status),
        Ok(Err(e)) => bail!("failed to run ffmpeg: {e}"),
        Err(_) => bail!("ffmpeg timed out after {}s", CONVERT_TIMEOUT.as_secs()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ytdlp::{DownloadOptions, ExtractorError, Resolved, ResolveOptions};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Extractor stub that writes a fixed thumbnail file per fetch
    struct StubExtractor {
        thumbnail_ext: Option<&'static str>,
        fetches: AtomicUsize,
    }

    impl StubExtractor {
        fn new(thumbnail_ext: Option<&'static str>) -> Self {
            Self {
                thumbnail_ext,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaExtractor for StubExtractor {
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
            Ok(())
        }

        async fn fetch_thumbnail(
            &self,
            _url: &str,
            output_template: &Path,
            _cookies: Option<&Path>,
        ) -> Result<(), ExtractorError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(ext) = self.thumbnail_ext {
                let tpl = output_template.to_string_lossy().into_owned();
                let path = tpl.replace("%(ext)s", ext);
                std::fs::write(path, b"img").unwrap();
            }
            Ok(())
        }
    }

    fn entry(id: Option<&str>) -> MediaEntry {
        MediaEntry {
            id: id.map(str::to_string),
            title: "T".to_string(),
            uploader: "A".to_string(),
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            album: None,
            upload_date: None,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_no_id_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubExtractor::new(Some("jpg"));
        let cover = save_cover(&stub, &entry(None), tmp.path(), Path::new("ffmpeg"), None)
            .await
            .unwrap();
        assert!(cover.is_none());
        assert_eq!(stub.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_traversal_id_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubExtractor::new(Some("jpg"));
        let cover = save_cover(
            &stub,
            &entry(Some("../evil")),
            tmp.path(),
            Path::new("ffmpeg"),
            None,
        )
        .await
        .unwrap();
        assert!(cover.is_none());
        assert_eq!(stub.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_cover_reused_without_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("abc.png"), b"img").unwrap();

        let stub = StubExtractor::new(Some("jpg"));
        let cover = save_cover(
            &stub,
            &entry(Some("abc")),
            tmp.path(),
            Path::new("ffmpeg"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(cover.as_deref(), Some("abc.png"));
        assert_eq!(stub.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetched_jpg_needs_no_conversion() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubExtractor::new(Some("jpg"));
        let cover = save_cover(
            &stub,
            &entry(Some("abc")),
            tmp.path(),
            Path::new("ffmpeg"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(cover.as_deref(), Some("abc.jpg"));
        assert_eq!(stub.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_conversion_failure_keeps_original() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubExtractor::new(Some("webp"));
        // A nonexistent ffmpeg binary forces the conversion fallback
        let cover = save_cover(
            &stub,
            &entry(Some("abc")),
            tmp.path(),
            Path::new("/definitely/not/ffmpeg"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(cover.as_deref(), Some("abc.webp"));
        assert!(tmp.path().join("abc.webp").exists());
    }

    #[tokio::test]
    async fn test_no_thumbnail_produced() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubExtractor::new(None);
        let cover = save_cover(
            &stub,
            &entry(Some("abc")),
            tmp.path(),
            Path::new("ffmpeg"),
            None,
        )
        .await
        .unwrap();
        assert!(cover.is_none());
    }
}
