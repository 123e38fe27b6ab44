//! Download pipeline: queue intake, metadata resolution, deduplication,
//! retrying download execution, and the per-run summary

pub mod classify;
pub mod dedup;
pub mod engine;
pub mod worker;

use crate::store::SongRecord;
use crate::utils::sanitize_filename;
use crate::ytdlp::ResolvedItem;

pub use engine::RunEngine;

/// A single resolved media item, possibly one of several expanded from a
/// playlist URL. Transient; becomes a [`SongRecord`] only after a
/// successful download.
#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub id: Option<String>,
    pub title: String,
    pub uploader: String,
    /// Canonical URL used for the download call
    pub url: String,
    /// Inferred album ("Nightcore" when the title carries that token)
    pub album: Option<String>,
    /// Upload date in ISO form, when the source reported one
    pub upload_date: Option<String>,
    pub description: String,
}

impl MediaEntry {
    /// Build an entry from resolved metadata
    ///
    /// Items without any usable URL are dropped; the resolver cannot hand
    /// the download call a target for them.
    pub fn from_item(item: ResolvedItem) -> Option<Self> {
        let url = item.webpage_url.or(item.url)?;
        let title = item
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Unknown Title".to_string());
        let uploader = item
            .uploader
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "Unknown Artist".to_string());
        let album = title
            .to_lowercase()
            .contains("nightcore")
            .then(|| "Nightcore".to_string());

        Some(Self {
            id: item.id.or(item.display_id),
            album,
            upload_date: item.upload_date.as_deref().and_then(format_upload_date),
            description: item.description.unwrap_or_default().trim().to_string(),
            title,
            uploader,
            url,
        })
    }

    /// Identity used against the song cache
    pub fn cache_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}|{}", self.title, self.uploader),
        }
    }

    /// Sanitized `title # uploader` stem used for final filenames and the
    /// output-directory duplicate scan
    pub fn file_stem(&self) -> String {
        sanitize_filename(&format!("{} # {}", self.title, self.uploader))
    }

    pub fn into_record(self, cover: Option<String>) -> SongRecord {
        SongRecord {
            id: self.id,
            title: self.title,
            artist: self.uploader,
            url: self.url,
            date: self.upload_date,
            cover,
        }
    }
}

/// Convert the source's compact `YYYYMMDD` form to ISO
fn format_upload_date(raw: &str) -> Option<String> {
    chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// A terminally failed queue URL or entry
#[derive(Debug, Clone)]
pub struct FailedEntry {
    pub title: String,
    pub artist: String,
    pub url: String,
    pub reason: String,
    /// 0 for pre-download failures, otherwise the download attempts made
    pub attempts: u32,
}

impl FailedEntry {
    /// Failure recorded before any entry existed (metadata phase, or the
    /// run-level disk precheck)
    pub fn placeholder(url: &str, reason: impl Into<String>) -> Self {
        Self {
            title: "—".to_string(),
            artist: "—".to_string(),
            url: url.to_string(),
            reason: reason.into(),
            attempts: 0,
        }
    }
}

/// Summary of one pipeline run over a queue snapshot
#[derive(Debug, Default)]
pub struct RunReport {
    pub downloaded: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub failed: Vec<FailedEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> ResolvedItem {
        ResolvedItem {
            id: Some("abc".to_string()),
            title: Some(title.to_string()),
            uploader: Some("Someone".to_string()),
            webpage_url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            upload_date: Some("20240501".to_string()),
            description: Some("  text  ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_item_basics() {
        let entry = MediaEntry::from_item(item("Some Song")).unwrap();
        assert_eq!(entry.title, "Some Song");
        assert_eq!(entry.uploader, "Someone");
        assert_eq!(entry.album, None);
        assert_eq!(entry.upload_date.as_deref(), Some("2024-05-01"));
        assert_eq!(entry.description, "text");
    }

    #[test]
    fn test_nightcore_album_inference_is_case_insensitive() {
        let entry = MediaEntry::from_item(item("NIGHTCORE Remix")).unwrap();
        assert_eq!(entry.album.as_deref(), Some("Nightcore"));
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let entry = MediaEntry::from_item(ResolvedItem {
            url: Some("https://example.com/x".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(entry.title, "Unknown Title");
        assert_eq!(entry.uploader, "Unknown Artist");
        assert_eq!(entry.cache_key(), "Unknown Title|Unknown Artist");
    }

    #[test]
    fn test_item_without_url_is_dropped() {
        assert!(
            MediaEntry::from_item(ResolvedItem {
                id: Some("abc".to_string()),
                ..Default::default()
            })
            .is_none()
        );
    }

    #[test]
    fn test_display_id_fallback() {
        let entry = MediaEntry::from_item(ResolvedItem {
            display_id: Some("dsp".to_string()),
            url: Some("https://example.com/x".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(entry.cache_key(), "dsp");
    }

    #[test]
    fn test_malformed_upload_date_dropped() {
        assert_eq!(format_upload_date("2024"), None);
        assert_eq!(format_upload_date("2024-05-01"), None);
        assert_eq!(format_upload_date("20241340"), None);
        assert_eq!(format_upload_date("20240501").as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_file_stem_is_sanitized() {
        let mut entry = MediaEntry::from_item(item("A/B: C")).unwrap();
        entry.uploader = "Artist?".to_string();
        assert_eq!(entry.file_stem(), "A⧸B꞉ C # Artist？");
    }
}
