//! Extraction tool invocation
//!
//! Wraps the external `yt-dlp` binary behind the [`MediaExtractor`] trait:
//! metadata resolution (`-J`), audio downloads with the opus post-processing
//! chain, and thumbnail-only fetches. All network access and site support
//! live in the tool; this module only builds option sets and interprets
//! exit status + stderr.

pub mod models;

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub use models::{Resolved, ResolvedItem};

/// Failure of an extraction tool invocation
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to run {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported a failure; `stderr` carries the raw
    /// free-text diagnostics used by the retry classifier
    #[error("{message}")]
    Failed { message: String, stderr: String },

    #[error("no metadata received")]
    Empty,

    #[error("unreadable metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExtractorError {
    /// Raw diagnostic text, when the tool produced any
    pub fn diagnostics(&self) -> &str {
        match self {
            Self::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }

    /// Full failure text: the message plus the raw diagnostics when the
    /// tool produced any. This is what failure summaries carry.
    pub fn detail(&self) -> String {
        let stderr = self.diagnostics().trim();
        if stderr.is_empty() {
            self.to_string()
        } else {
            format!("{self}: {stderr}")
        }
    }
}

/// Options for a metadata resolution call
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Flattened, metadata-only playlist mode with a bounded child count
    pub playlist: bool,
    /// Cap on expanded playlist children
    pub playlist_end: u32,
    pub cookies: Option<PathBuf>,
}

/// Options for a download call
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Output path template (`%(ext)s` placeholder included)
    pub output_template: PathBuf,
    pub cookies: Option<PathBuf>,
    pub ffmpeg_location: Option<PathBuf>,
    /// Alternate client identity used by the blocked-access retry
    pub client_override: Option<String>,
}

/// Seam between the pipeline and the external extraction/download tool
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Resolve a URL into metadata without fetching any media
    async fn resolve(&self, url: &str, opts: &ResolveOptions) -> Result<Resolved, ExtractorError>;

    /// Download audio with the full post-processing chain
    async fn download(&self, url: &str, opts: &DownloadOptions) -> Result<(), ExtractorError>;

    /// Fetch only the thumbnail artifact for a URL
    async fn fetch_thumbnail(
        &self,
        url: &str,
        output_template: &Path,
        cookies: Option<&Path>,
    ) -> Result<(), ExtractorError>;
}

/// [`MediaExtractor`] backed by the `yt-dlp` binary
pub struct YtDlp {
    bin: PathBuf,
}

impl YtDlp {
    pub fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    async fn run(&self, args: Vec<OsString>) -> Result<std::process::Output, ExtractorError> {
        debug!("Running {} with {} arg(s)", self.bin.display(), args.len());

        let output = Command::new(&self.bin)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractorError::Spawn {
                bin: self.bin.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractorError::Failed {
                message: format!("{} exited with {}", self.bin.display(), output.status),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output)
    }
}

/// Flags shared by every invocation
fn common_args(args: &mut Vec<OsString>, cookies: Option<&Path>) {
    args.extend(
        ["--no-warnings", "--no-progress", "--force-ipv4", "--quiet"]
            .iter()
            .map(OsString::from),
    );
    if let Some(cookies) = cookies {
        args.push("--cookies".into());
        args.push(cookies.into());
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn resolve(&self, url: &str, opts: &ResolveOptions) -> Result<Resolved, ExtractorError> {
        let mut args: Vec<OsString> = vec!["-J".into(), "--ignore-errors".into()];
        if opts.playlist {
            args.push("--flat-playlist".into());
            args.push("--playlist-end".into());
            args.push(opts.playlist_end.to_string().into());
        }
        common_args(&mut args, opts.cookies.as_deref());
        args.push(url.into());

        let output = self.run(args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Err(ExtractorError::Empty);
        }

        Ok(serde_json::from_str(&stdout)?)
    }

    async fn download(&self, url: &str, opts: &DownloadOptions) -> Result<(), ExtractorError> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            "bestaudio/best".into(),
            "-o".into(),
            opts.output_template.as_os_str().to_owned(),
            "--extract-audio".into(),
            "--audio-format".into(),
            "opus".into(),
            "--audio-quality".into(),
            "0".into(),
            "--embed-metadata".into(),
            "--embed-thumbnail".into(),
        ];
        if let Some(ffmpeg) = &opts.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }
        if let Some(client) = &opts.client_override {
            args.push("--extractor-args".into());
            args.push(format!("youtube:player_client={client}").into());
        }
        common_args(&mut args, opts.cookies.as_deref());
        args.push(url.into());

        self.run(args).await?;
        Ok(())
    }

    async fn fetch_thumbnail(
        &self,
        url: &str,
        output_template: &Path,
        cookies: Option<&Path>,
    ) -> Result<(), ExtractorError> {
        let mut args: Vec<OsString> = vec![
            "--skip-download".into(),
            "--write-thumbnail".into(),
            "-o".into(),
            output_template.as_os_str().to_owned(),
        ];
        common_args(&mut args, cookies);
        args.push(url.into());

        self.run(args).await?;
        Ok(())
    }
}
