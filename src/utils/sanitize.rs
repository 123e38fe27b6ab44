//! Filename and user-id sanitization utilities

use anyhow::{Result, bail};

/// Maximum length for a sanitized filename stem
const MAX_NAME_LEN: usize = 200;

/// Sanitize a filename for safe filesystem usage
///
/// Replaces filesystem-unsafe characters with visually similar Unicode
/// alternatives that are safe to use in filenames across all major
/// operating systems, caps the length, and strips trailing dots.
///
/// # Examples
///
/// ```
/// use tunedrop::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("BOTHERED / UNBOTHERED"), "BOTHERED ⧸ UNBOTHERED");
/// assert_eq!(sanitize_filename("Transistor: Original Soundtrack"), "Transistor꞉ Original Soundtrack");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let capped: String = name.chars().take(MAX_NAME_LEN).collect();

    capped
        .chars()
        .map(|c| match c {
            '/' => '⧸',  // U+29F8 - Big Solidus (looks like / but is filesystem-safe)
            '\\' => '⧹', // U+29F9 - Big Reverse Solidus
            ':' => '꞉',  // U+A789 - Modifier Letter Colon
            '*' => '⁎',  // U+204E - Low Asterisk
            '?' => '？', // U+FF1F - Fullwidth Question Mark
            '"' => '″',  // U+2033 - Double Prime
            '<' => '‹',  // U+2039 - Single Left Angle Quote
            '>' => '›',  // U+203A - Single Right Angle Quote
            '|' => '｜', // U+FF5C - Fullwidth Vertical Line
            '\0' => '_', // Null byte has no good lookalike, use underscore
            _ => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// Validate a user id before it is used to build filesystem paths
///
/// User ids are numeric (chat platform ids are numeric), which also rules
/// out path traversal.
pub fn sanitize_user_id(user_id: &str) -> Result<String> {
    let trimmed = user_id.trim();

    if trimmed.is_empty() {
        bail!("user id is empty");
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        bail!("user id must be numeric: {trimmed:?}");
    }

    Ok(trimmed.to_string())
}
