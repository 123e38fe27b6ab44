//! Models for the extraction tool's JSON metadata output

use serde::Deserialize;

/// Top-level result of a metadata resolution call
///
/// Playlists carry `entries` (children may be null when the tool could not
/// extract them); everything else is a single item described by the
/// flattened fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub entries: Option<Vec<Option<ResolvedItem>>>,
    #[serde(flatten)]
    pub item: ResolvedItem,
}

/// A single resolved media item, either standalone or a playlist child
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedItem {
    pub id: Option<String>,
    pub display_id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub upload_date: Option<String>,
    pub description: Option<String>,
}
