//! Blocked-access failure classification
//!
//! Decides whether a failed download attempt should be retried with the
//! alternate client identity. Classification works by substring matching
//! on the tool's free-text error output, which is inherently brittle
//! against upstream wording changes; keep the patterns in sync with the
//! extraction tool's releases.

/// A failure reason that warrants the alternate-client retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSignal {
    /// HTTP 403 or an explicit "forbidden"
    Forbidden,
    /// HTTP 429 / "too many requests"
    RateLimited,
    /// Age-verification prompt
    AgeGate,
    /// Embedding/playback disabled by the video owner
    OwnerDisabled,
}

/// Classify free-text failure output from the extraction tool
///
/// Returns `None` for anything outside the blocked-access signal set;
/// those failures are terminal on the first attempt.
pub fn classify(text: &str) -> Option<BlockSignal> {
    let t = text.to_lowercase();

    if t.contains("http error 403") || t.contains("forbidden") {
        return Some(BlockSignal::Forbidden);
    }
    if t.contains("429") || t.contains("too many requests") {
        return Some(BlockSignal::RateLimited);
    }
    if t.contains("sign in to confirm your age") {
        return Some(BlockSignal::AgeGate);
    }
    if t.contains("playback on other websites has been disabled by the video owner") {
        return Some(BlockSignal::OwnerDisabled);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden() {
        assert_eq!(
            classify("ERROR: unable to download video data: HTTP Error 403: Forbidden"),
            Some(BlockSignal::Forbidden)
        );
        assert_eq!(classify("Access FORBIDDEN"), Some(BlockSignal::Forbidden));
    }

    #[test]
    fn test_rate_limited() {
        assert_eq!(
            classify("HTTP Error 429: Too Many Requests"),
            Some(BlockSignal::RateLimited)
        );
    }

    #[test]
    fn test_age_gate() {
        assert_eq!(
            classify("ERROR: Sign in to confirm your age. This video may be inappropriate"),
            Some(BlockSignal::AgeGate)
        );
    }

    #[test]
    fn test_owner_disabled() {
        assert_eq!(
            classify("Playback on other websites has been disabled by the video owner"),
            Some(BlockSignal::OwnerDisabled)
        );
    }

    #[test]
    fn test_unrelated_errors_are_terminal() {
        assert_eq!(classify("ERROR: Video unavailable"), None);
        assert_eq!(classify("This video is private"), None);
        assert_eq!(classify(""), None);
    }
}
