//! JSON file storage shared by the caches

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// Reads a JSON file, returning `None` if it does not exist
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CacheError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes a JSON file atomically
///
/// The value is written to `<path>.tmp`, synced, then renamed over `path`,
/// so readers see either the old or the new file, never a partial write.
pub(crate) fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }
    }

    let tmp_path = tmp_path(path);
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| CacheError::io(&tmp_path, e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| CacheError::io(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| CacheError::io(path, e))?;

    // Not every platform can open a directory for syncing.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = OpenOptions::new().read(true).open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Removes a cache file, returning whether it existed
pub(crate) fn remove(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let loaded: Option<Vec<String>> = load_json(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        save_json_atomic(&path, &vec!["a".to_string()]).unwrap();
        let loaded: Option<Vec<String>> = load_json(&path).unwrap();

        assert_eq!(loaded, Some(vec!["a".to_string()]));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_garbage_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{not json").unwrap();

        let result: Result<Option<Vec<String>>, _> = load_json(&path);
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"[]").unwrap();

        assert!(remove(&path).unwrap());
        assert!(!remove(&path).unwrap());
    }
}
