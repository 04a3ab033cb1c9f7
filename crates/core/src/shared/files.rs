use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::shared::constants::ALLOWED_EXTENSIONS;

/// Whether the file name carries an accepted audio extension.
pub fn allowed_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether `path` resolves inside `work_dir`. Guards against chunk paths
/// escaping the temporary directory they were materialized into.
pub fn path_within(path: &Path, work_dir: &Path) -> bool {
    let abs_dir = match work_dir.canonicalize() {
        Ok(d) => d,
        Err(_) => return false,
    };
    let abs_path = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => return false,
    };
    abs_path.starts_with(&abs_dir)
}

/// Remove each file if it exists, returning how many were deleted.
pub fn remove_files(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        if path.exists() {
            match fs::remove_file(path) {
                Ok(()) => {
                    log::info!("Removed file: {}", path.display());
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to remove {}: {e}", path.display()),
            }
        }
    }
    removed
}

/// Delete files in `dir` whose modification time is older than `max_age`.
/// Returns the number of files deleted. The directory is created if missing.
pub fn cleanup_old_files(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age > max_age {
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Deleted old file: {}", path.display());
                    removed += 1;
                }
                Err(e) => log::warn!("Error deleting file {}: {e}", path.display()),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file_accepts_known_extensions() {
        assert!(allowed_file(Path::new("recording.mp3")));
        assert!(allowed_file(Path::new("meeting.M4A")));
        assert!(allowed_file(Path::new("/tmp/audio.webm")));
    }

    #[test]
    fn test_allowed_file_rejects_unknown() {
        assert!(!allowed_file(Path::new("notes.txt")));
        assert!(!allowed_file(Path::new("no_extension")));
        assert!(!allowed_file(Path::new("archive.flac")));
    }

    #[test]
    fn test_path_within_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().join("chunk_0.mp3");
        fs::write(&inside, b"x").unwrap();
        assert!(path_within(&inside, dir.path()));

        let other = tempfile::tempdir().unwrap();
        let outside = other.path().join("chunk_0.mp3");
        fs::write(&outside, b"x").unwrap();
        assert!(!path_within(&outside, dir.path()));
    }

    #[test]
    fn test_remove_files_counts_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.mp3");
        let b = dir.path().join("b.mp3");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();
        let missing = dir.path().join("missing.mp3");

        let removed = remove_files(&[a.clone(), b.clone(), missing]);
        assert_eq!(removed, 2);
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_cleanup_old_files_removes_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.mp3");
        fs::write(&stale, b"x").unwrap();

        std::thread::sleep(Duration::from_millis(50));
        let removed = cleanup_old_files(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
    }

    #[test]
    fn test_cleanup_old_files_keeps_fresh_entries() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.mp3");
        fs::write(&fresh, b"x").unwrap();

        let removed = cleanup_old_files(dir.path(), Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);
        assert!(fresh.exists());
    }

    #[test]
    fn test_cleanup_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("work");
        let removed = cleanup_old_files(&missing, Duration::ZERO).unwrap();
        assert_eq!(removed, 0);
        assert!(missing.exists());
    }
}
