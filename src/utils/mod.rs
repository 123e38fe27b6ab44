//! Utility functions

pub mod disk;
mod sanitize;
pub mod urls;

pub use sanitize::{sanitize_filename, sanitize_user_id};

/// Truncate free-text diagnostics to a displayable length
pub fn shorten(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let capped: String = trimmed.chars().take(max_len).collect();
    format!("{capped} …")
}
