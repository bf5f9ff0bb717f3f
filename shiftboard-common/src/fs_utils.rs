//! File helpers shared by the schedule store and roster directory
//!
//! Writes go to a temporary sibling file that is synced and then renamed
//! over the target, so readers see either the old or the new document,
//! never a truncated one.

use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Result of loading a JSON file that is allowed to be missing or broken
#[derive(Debug, Clone, PartialEq)]
pub enum JsonFile {
    Missing,
    /// Present but unreadable or not valid JSON
    Corrupt(String),
    Loaded(Value),
}

impl JsonFile {
    /// Parsed value, or `None` when missing or corrupt
    pub fn into_value(self) -> Option<Value> {
        match self {
            JsonFile::Loaded(value) => Some(value),
            JsonFile::Missing | JsonFile::Corrupt(_) => None,
        }
    }
}

/// Load a JSON file without ever failing
pub fn read_json(path: &Path) -> JsonFile {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return JsonFile::Missing,
        Err(e) => return JsonFile::Corrupt(e.to_string()),
    };
    match serde_json::from_str(&text) {
        Ok(value) => JsonFile::Loaded(value),
        Err(e) => JsonFile::Corrupt(e.to_string()),
    }
}

/// Write `value` as pretty-printed UTF-8 JSON, atomically
pub fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Replace `path` with `bytes` via temp file + rename
///
/// Each call gets its own uniquely named temp file in the target directory,
/// so concurrent writers never share a temp path and the last rename wins.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("path has no parent: {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    // On failure the temp file is removed when `err.file` drops
    temp.persist(path).map_err(|err| Error::Io(err.error))?;

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Copy the current contents of `path` to `<path>.bak`
///
/// Best effort: a missing source is not an error and a failed copy is only
/// logged. The backup itself is written atomically. Returns the backup path
/// when a copy was made.
pub fn backup_existing(path: &Path) -> Option<PathBuf> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Backup read failed, continuing with write");
            return None;
        }
    };
    let backup = backup_path(path);
    match write_atomic(&backup, &contents) {
        Ok(()) => {
            debug!(backup = %backup.display(), "Backed up previous file");
            Some(backup)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Backup copy failed, continuing with write");
            None
        }
    }
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_json_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(read_json(&path), JsonFile::Missing);

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_json(&path), JsonFile::Corrupt(_)));
        assert_eq!(read_json(&path).into_value(), None);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("2025-04.json");

        write_json_atomic(&path, &json!({"1": {"early": ["A", ""]}})).unwrap();

        assert_eq!(read_json(&path), JsonFile::Loaded(json!({"1": {"early": ["A", ""]}})));
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_atomic_write_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pretty.json");

        write_json_atomic(&path, &json!({"1": {"early": ["A", ""]}})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        assert!(text.starts_with("{\n"));
    }

    #[test]
    fn test_backup_copies_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2025-04.json");
        assert_eq!(backup_existing(&path), None);

        fs::write(&path, "old").unwrap();
        let backup = backup_existing(&path).unwrap();

        assert_eq!(backup, dir.path().join("2025-04.json.bak"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "old");
    }

    #[test]
    fn test_failed_persist_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes the final rename fail
        let path = dir.path().join("2025-04.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(write_atomic(&path, b"{}").is_err());

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2025-04.json".to_string()]);
    }
}
