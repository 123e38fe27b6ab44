//! Metadata tag writing for produced audio files
//!
//! Dispatches on the container kind derived from the file extension; each
//! kind knows which tag fields its container supports. Tagging failures are
//! reported to the caller but must never fail the owning entry.

use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::{debug, warn};

use crate::download::MediaEntry;

/// Supported audio container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Mp3,
    M4a,
    Opus,
    Flac,
}

impl ContainerKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mp3),
            "m4a" => Some(Self::M4a),
            "opus" => Some(Self::Opus),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }

    /// Apply the entry's metadata fields to a tag for this container
    ///
    /// The source URL lands in the container's description field, falling
    /// back to the comment field when the container rejects it. The entry's
    /// textual description goes to the comment field with a `SYNOPSIS`
    /// fallback, except on MP4 where it goes to the `ldes` atom directly.
    pub fn apply(&self, tag: &mut Tag, entry: &MediaEntry) {
        tag.set_title(entry.title.clone());
        tag.set_artist(entry.uploader.clone());
        if let Some(album) = &entry.album {
            tag.set_album(album.clone());
        }
        if let Some(date) = &entry.upload_date {
            tag.insert_text(ItemKey::RecordingDate, date.clone());
        }

        if !tag.insert_text(ItemKey::Description, entry.url.clone()) {
            tag.insert_text(ItemKey::Comment, entry.url.clone());
        }

        if !entry.description.is_empty() {
            match self {
                // MP4 carries long descriptions in its own atom
                Self::M4a => {
                    tag.insert_text(
                        ItemKey::Unknown("ldes".to_string()),
                        entry.description.clone(),
                    );
                }
                _ => {
                    if !tag.insert_text(ItemKey::Comment, entry.description.clone()) {
                        tag.insert_text(
                            ItemKey::Unknown("SYNOPSIS".to_string()),
                            entry.description.clone(),
                        );
                    }
                }
            }
        }
    }
}

/// Write the entry's metadata into the audio file at `path`
///
/// Unknown extensions are skipped with a warning.
pub fn write_tags(path: &Path, entry: &MediaEntry) -> Result<()> {
    let Some(kind) = ContainerKind::from_path(path) else {
        warn!("Unknown audio format, skipping tags: {}", path.display());
        return Ok(());
    };

    let mut tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file tags")?;

    // Get the primary tag (or create one for the container's tag type)
    let tag = match tagged_file.primary_tag_mut() {
        Some(tag) => tag,
        None => {
            if let Some(tag) = tagged_file.first_tag_mut() {
                tag
            } else {
                let tag_type = tagged_file.primary_tag_type();
                tagged_file.insert_tag(Tag::new(tag_type));
                tagged_file
                    .primary_tag_mut()
                    .context("Failed to create tag")?
            }
        }
    };

    kind.apply(tag, entry);

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .context("Failed to save audio file tags")?;

    debug!("Tagged {}", path.display());
    Ok(())
}
