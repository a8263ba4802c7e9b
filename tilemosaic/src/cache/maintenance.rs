//! Disk cache statistics and clearing.

use super::disk::is_tile_file;
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of clearing a disk cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    /// Tile files removed
    pub files_deleted: u64,
    /// Bytes released
    pub bytes_freed: u64,
}

/// Counts cached tile files and their total size.
///
/// A missing directory is an empty cache.
pub fn disk_cache_stats(cache_dir: &Path) -> io::Result<(u64, u64)> {
    let mut files = 0;
    let mut bytes = 0;
    walk(cache_dir, &mut |_path, len| {
        files += 1;
        bytes += len;
        Ok(())
    })?;
    Ok((files, bytes))
}

/// Deletes every cached tile and prunes the emptied directories.
///
/// The cache root itself is kept.
pub fn clear_disk_cache(cache_dir: &Path) -> io::Result<ClearResult> {
    let mut result = ClearResult::default();
    walk(cache_dir, &mut |path, len| {
        fs::remove_file(path)?;
        result.files_deleted += 1;
        result.bytes_freed += len;
        Ok(())
    })?;
    prune_empty_dirs(cache_dir, true)?;
    Ok(result)
}

/// Visits every tile file below `dir`.
fn walk(dir: &Path, visit: &mut dyn FnMut(&Path, u64) -> io::Result<()>) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&path, visit)?;
        } else if file_type.is_file() && is_tile_file(&path) {
            let len = entry.metadata()?.len();
            visit(&path, len)?;
        }
    }
    Ok(())
}

/// Removes empty directories bottom-up. Returns true when `dir` was removed.
fn prune_empty_dirs(dir: &Path, keep_root: bool) -> io::Result<bool> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let mut empty = true;
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if !prune_empty_dirs(&entry.path(), false)? {
                empty = false;
            }
        } else {
            empty = false;
        }
    }

    if empty && !keep_root {
        fs::remove_dir(dir)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(root: &Path) {
        let dir = root.join("mola/4/0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("0.png"), vec![0u8; 100]).unwrap();
        fs::write(dir.join("1.png"), vec![0u8; 50]).unwrap();
        fs::write(root.join("notes.txt"), b"keep").unwrap();
    }

    #[test]
    fn test_stats_counts_tiles_only() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());
        assert_eq!(disk_cache_stats(temp.path()).unwrap(), (2, 150));
    }

    #[test]
    fn test_stats_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert_eq!(disk_cache_stats(&temp.path().join("absent")).unwrap(), (0, 0));
    }

    #[test]
    fn test_clear_removes_tiles_and_empty_dirs() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let result = clear_disk_cache(temp.path()).unwrap();
        assert_eq!(
            result,
            ClearResult {
                files_deleted: 2,
                bytes_freed: 150
            }
        );
        assert!(!temp.path().join("mola").exists());
        assert!(temp.path().join("notes.txt").exists());
        assert!(temp.path().exists());
    }
}
