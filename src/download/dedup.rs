//! Duplicate filtering against the song cache and the output directory
//!
//! Runs once, sequentially, after all metadata resolution has completed,
//! against the cache state as it existed at run start. Two queued URLs
//! that resolve to the same not-yet-cached id therefore both survive the
//! filter within a single run; that is documented behavior, not a defect
//! to fix here.

use std::path::Path;
use tracing::debug;

use crate::download::MediaEntry;
use crate::store::SongCache;

/// Drop entries already present in the cache or on disk
///
/// Returns the surviving entries and the number filtered out.
pub fn filter_duplicates(
    entries: Vec<MediaEntry>,
    cache: &SongCache,
    out_dir: &Path,
) -> (Vec<MediaEntry>, usize) {
    let raw_count = entries.len();

    let survivors: Vec<MediaEntry> = entries
        .into_iter()
        .filter(|entry| !is_duplicate(entry, cache, out_dir))
        .collect();

    let dup_count = raw_count - survivors.len();
    if dup_count > 0 {
        debug!("Filtered {} duplicate entr(ies)", dup_count);
    }

    (survivors, dup_count)
}

fn is_duplicate(entry: &MediaEntry, cache: &SongCache, out_dir: &Path) -> bool {
    // id key when the source reported one, else title|artist
    if cache.contains(&entry.cache_key()) {
        return true;
    }
    // An id-bearing entry can still match a record cached without an id
    if entry.id.is_some() && cache.contains(&format!("{}|{}", entry.title, entry.uploader)) {
        return true;
    }

    // A file already produced for this entry counts even when the cache
    // record was lost
    let stem = entry.file_stem();
    matches_on_disk(out_dir, &stem)
}

fn matches_on_disk(out_dir: &Path, stem: &str) -> bool {
    let Ok(dir) = std::fs::read_dir(out_dir) else {
        return false;
    };
    dir.flatten()
        .any(|dirent| dirent.file_name().to_string_lossy().contains(stem))
}
