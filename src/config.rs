//! Runtime configuration
//!
//! Resolves the data root and external tool locations once at startup.
//! Layout under the data root:
//!
//! ```text
//! data/
//!   downloads/<user>/   final audio files + song-list.json
//!   covers/<user>/      <video id>.<ext> cover files
//!   queues/<user>.json  pending URL queue
//!   cookies.txt         optional, applied to every extraction call
//! ```

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::utils::sanitize_user_id;

/// Minimum free space on the output volume before a run starts, in MB
pub const DEFAULT_MIN_FREE_MB: u64 = 100;

/// Default worker-pool width for both pipeline phases
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root for all persistent state
    pub data_root: PathBuf,
    /// Location of the ffmpeg binary used for cover conversion
    pub ffmpeg_bin: PathBuf,
    /// Location of the extraction tool binary
    pub ytdlp_bin: PathBuf,
    /// Disk-space precondition for a run
    pub min_free_mb: u64,
}

impl Config {
    /// Resolve configuration from an optional explicit data root and the
    /// environment
    pub fn load(data_root: Option<PathBuf>) -> Result<Self> {
        let data_root = data_root
            .or_else(|| env::var_os("TUNEDROP_DATA_ROOT").map(PathBuf::from))
            .or_else(|| dirs::data_dir().map(|d| d.join("tunedrop")))
            .unwrap_or_else(|| PathBuf::from("data"));

        fs::create_dir_all(&data_root)
            .with_context(|| format!("Failed to create data root {}", data_root.display()))?;

        let config = Self {
            data_root,
            ffmpeg_bin: find_ffmpeg(env::var_os("FFMPEG_PATH").map(PathBuf::from)),
            ytdlp_bin: env::var_os("YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("yt-dlp")),
            min_free_mb: DEFAULT_MIN_FREE_MB,
        };

        debug!(
            "Config: data_root={} ffmpeg={} ytdlp={}",
            config.data_root.display(),
            config.ffmpeg_bin.display(),
            config.ytdlp_bin.display()
        );

        Ok(config)
    }

    pub fn downloads_root(&self) -> PathBuf {
        self.data_root.join("downloads")
    }

    pub fn covers_root(&self) -> PathBuf {
        self.data_root.join("covers")
    }

    pub fn queues_root(&self) -> PathBuf {
        self.data_root.join("queues")
    }

    /// Cookie file applied to every extraction call when present on disk
    pub fn cookies_file(&self) -> Option<PathBuf> {
        let path = self.data_root.join("cookies.txt");
        path.is_file().then_some(path)
    }

    /// Output directory for a user's final audio files, created on demand
    pub fn user_output_dir(&self, user: &str) -> Result<PathBuf> {
        self.user_dir(&self.downloads_root(), user)
    }

    /// Cover directory for a user, created on demand
    pub fn user_cover_dir(&self, user: &str) -> Result<PathBuf> {
        self.user_dir(&self.covers_root(), user)
    }

    fn user_dir(&self, root: &Path, user: &str) -> Result<PathBuf> {
        let user = sanitize_user_id(user)?;
        let dir = root.join(&user);

        // The numeric user id already rules out traversal, this is a
        // final containment guard before any directory creation.
        if !dir.starts_with(root) {
            anyhow::bail!("user directory {} escapes {}", dir.display(), root.display());
        }

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create user directory {}", dir.display()))?;
        Ok(dir)
    }
}

/// Locate ffmpeg from an explicit hint (file or directory), falling back
/// to whatever `ffmpeg` resolves to on PATH
fn find_ffmpeg(hint: Option<PathBuf>) -> PathBuf {
    if let Some(hint) = hint {
        if hint.is_file() {
            return hint;
        }
        if hint.is_dir() {
            let nested = hint.join("ffmpeg");
            if nested.is_file() {
                return nested;
            }
        }
    }
    PathBuf::from("ffmpeg")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        Config {
            data_root: dir.to_path_buf(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ytdlp_bin: PathBuf::from("yt-dlp"),
            min_free_mb: DEFAULT_MIN_FREE_MB,
        }
    }

    #[test]
    fn test_user_dirs_created() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let out = config.user_output_dir("42").unwrap();
        assert!(out.is_dir());
        assert!(out.ends_with("downloads/42"));

        let covers = config.user_cover_dir("42").unwrap();
        assert!(covers.ends_with("covers/42"));
    }

    #[test]
    fn test_invalid_user_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        assert!(config.user_output_dir("../escape").is_err());
    }

    #[test]
    fn test_cookies_only_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        assert!(config.cookies_file().is_none());

        fs::write(tmp.path().join("cookies.txt"), "# cookies").unwrap();
        assert!(config.cookies_file().is_some());
    }

    #[test]
    fn test_find_ffmpeg_dir_hint() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("ffmpeg");
        fs::write(&bin, "").unwrap();
        assert_eq!(find_ffmpeg(Some(tmp.path().to_path_buf())), bin);
        assert_eq!(find_ffmpeg(None), PathBuf::from("ffmpeg"));
    }
}
