//! Remote URL shape classification
//!
//! Decides whether a queued URL should be resolved as a playlist (flat,
//! capped expansion) or as a single item, and strips playlist-context
//! query parameters from single-item links so the resolver does not wander
//! into the surrounding playlist.

use url::Url;

/// Maximum accepted URL length; anything longer is not queueable
pub const MAX_URL_LEN: usize = 2000;

/// Query parameters that tie a single video link to a playlist context
const PLAYLIST_CONTEXT_PARAMS: &[&str] = &["list", "index", "start_radio"];

/// Returns true when the URL should be resolved in playlist mode
///
/// A `/playlist` path is always a playlist. A `/watch` path with a `list`
/// parameter but no `v` parameter is one too. Everything else, including
/// `/shorts/` paths and short-host single-video links, is a single item.
pub fn is_playlist_url(raw: &str) -> bool {
    if raw.len() > MAX_URL_LEN {
        return false;
    }

    let Ok(url) = Url::parse(raw) else {
        return false;
    };

    let host = url.host_str().unwrap_or("").to_lowercase();
    if !host.contains("youtube.com") && !host.contains("youtu.be") {
        return false;
    }

    let path = url.path();
    if path.starts_with("/playlist") {
        return true;
    }
    if host.ends_with("youtu.be") && !path.trim_matches('/').is_empty() {
        return false;
    }
    if path.starts_with("/shorts/") {
        return false;
    }

    let has_v = url.query_pairs().any(|(k, _)| k == "v");
    let has_list = url.query_pairs().any(|(k, _)| k == "list");
    path.starts_with("/watch") && has_list && !has_v
}

/// Remove playlist-context query parameters from a single-item URL
///
/// Returns the input unchanged when it does not parse as a URL.
pub fn strip_playlist_context(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !PLAYLIST_CONTEXT_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_path() {
        assert!(is_playlist_url(
            "https://www.youtube.com/playlist?list=PLabc123"
        ));
    }

    #[test]
    fn test_watch_with_list_but_no_video() {
        assert!(is_playlist_url(
            "https://www.youtube.com/watch?list=PLabc123"
        ));
    }

    #[test]
    fn test_watch_with_video_and_list_is_single() {
        assert!(!is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=PLabc123"
        ));
    }

    #[test]
    fn test_shorts_is_single() {
        assert!(!is_playlist_url("https://www.youtube.com/shorts/abc123"));
    }

    #[test]
    fn test_short_host_is_single() {
        assert!(!is_playlist_url("https://youtu.be/abc123?list=PLabc"));
    }

    #[test]
    fn test_foreign_host_is_single() {
        assert!(!is_playlist_url("https://example.com/playlist?list=x"));
    }

    #[test]
    fn test_strip_playlist_context() {
        let stripped = strip_playlist_context(
            "https://www.youtube.com/watch?v=abc&list=PLx&index=4&start_radio=1",
        );
        let url = Url::parse(&stripped).unwrap();
        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, vec!["v"]);
    }

    #[test]
    fn test_strip_leaves_clean_url_alone() {
        let stripped = strip_playlist_context("https://www.youtube.com/watch?v=abc");
        let url = Url::parse(&stripped).unwrap();
        assert_eq!(url.query(), Some("v=abc"));
    }

    #[test]
    fn test_strip_unparseable_passthrough() {
        assert_eq!(strip_playlist_context("not a url"), "not a url");
    }
}
