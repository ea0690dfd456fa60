//! Mtime-based freshness detection for built packages.
//!
//! Used for the cross-invocation build skip: a destination that already
//! exists and is newer than the source metadata document does not need to
//! be rebuilt. Any I/O error on either side reads as "not fresh", which
//! forces a rebuild rather than silently trusting stale state.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if the destination mtime is newer than the given source mtime
///
/// Returns `true` only when both times are known and the destination is
/// strictly newer; unknown times force a rebuild.
pub fn is_fresh(dest: Option<SystemTime>, source: Option<SystemTime>) -> bool {
    match (dest, source) {
        (Some(d), Some(s)) => d > s,
        _ => false,
    }
}

/// Check if file A is newer than file B
///
/// Returns `false` if either file doesn't exist or times can't be compared
pub fn is_newer_than(a: &Path, b: &Path) -> bool {
    is_fresh(get_mtime(a), get_mtime(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_file_is_never_fresh() {
        assert_eq!(get_mtime(Path::new("/nonexistent/deep/file")), None);
        assert!(!is_fresh(None, Some(SystemTime::now())));
        assert!(!is_fresh(Some(SystemTime::now()), None));
        assert!(!is_fresh(None, None));
    }

    #[test]
    fn test_newer_mtime_is_fresh() {
        let earlier = SystemTime::UNIX_EPOCH;
        let later = earlier + Duration::from_secs(10);
        assert!(is_fresh(Some(later), Some(earlier)));
        assert!(!is_fresh(Some(earlier), Some(later)));
        assert!(!is_fresh(Some(earlier), Some(earlier)));
    }

    #[test]
    fn test_is_newer_than_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();
        filetime::set_file_mtime(&a, filetime::FileTime::from_unix_time(1_000, 0)).unwrap();
        filetime::set_file_mtime(&b, filetime::FileTime::from_unix_time(2_000, 0)).unwrap();
        assert!(is_newer_than(&b, &a));
        assert!(!is_newer_than(&a, &b));
    }
}
