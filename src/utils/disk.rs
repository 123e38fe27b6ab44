//! Disk-space precheck for the output volume

use std::path::Path;

use nix::sys::statvfs::statvfs;
use tracing::warn;

/// Returns true when at least `required_mb` megabytes are free on the
/// volume holding `path`
///
/// An unreadable statvfs is logged and treated as sufficient, so a broken
/// stat call never blocks downloads on its own.
pub fn has_free_space(path: &Path, required_mb: u64) -> bool {
    match statvfs(path) {
        Ok(stat) => {
            let available_mb =
                (stat.blocks_available() as u64 * stat.fragment_size() as u64) / (1024 * 1024);
            if available_mb < required_mb {
                warn!(
                    "Low disk space: {} MB available (need {} MB)",
                    available_mb, required_mb
                );
                return false;
            }
            true
        }
        Err(e) => {
            warn!("Could not check disk space for {}: {}", path.display(), e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_requirement_always_passes() {
        assert!(has_free_space(Path::new("/"), 0));
    }

    #[test]
    fn test_absurd_requirement_fails() {
        assert!(!has_free_space(Path::new("/"), u64::MAX / (1024 * 1024)));
    }

    #[test]
    fn test_missing_path_is_permissive() {
        assert!(has_free_space(Path::new("/definitely/not/a/path"), 100));
    }
}
