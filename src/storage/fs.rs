//! Filesystem helpers: atomic replace, idempotent directory creation and
//! document file listing.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use super::errors::{Result, StoreError};

/// Suffix of the sibling file written before the rename into place
pub const TEMP_SUFFIX: &str = ".tmp";

/// Replace `path` with `contents` so readers see either the old or the new
/// bytes, never a partial write.
///
/// The data is written and synced to a uniquely named hidden sibling, then
/// renamed over the target. Concurrent writers never share a temporary file.
/// On failure the temporary file is removed and the previous content of
/// `path` is untouched.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Created with 0600 on Unix and deleted on drop unless persisted.
    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    // Persist the rename itself. Not supported everywhere, so best-effort.
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Create `dir` and its parents. Succeeds if another creator won the race.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Reject names that would escape the collection directory or collide with
/// the temporary files used during writes.
pub fn validate_file_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.ends_with(TEMP_SUFFIX)
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Names of the document files directly inside `dir`, sorted.
///
/// Subdirectories, hidden entries and leftover temporary files are skipped.
pub fn list_document_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                log::warn!("Skipping non UTF-8 file name {:?} in {:?}", raw, dir);
                continue;
            }
        };
        if name.starts_with('.') || name.ends_with(TEMP_SUFFIX) {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(TEMP_SUFFIX))
            .collect()
    }

    #[test]
    fn test_atomic_write_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_failed_write_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        atomic_write(&path, b"old").unwrap();

        // A non-empty directory in place of the target makes the rename fail.
        let blocked = dir.path().join("blocked.json");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), "x").unwrap();
        assert!(atomic_write(&blocked, b"new").is_err());

        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_concurrent_writers_do_not_share_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.json");

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        atomic_write(&path, format!("writer-{}", i).as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(fs::read_to_string(&path).unwrap().starts_with("writer-"));
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("alice.json").is_ok());
        for bad in ["", ".", "..", ".hidden", "a/b", "..\\x", "doc.json.tmp"] {
            assert!(validate_file_name(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_list_skips_temp_hidden_and_dirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("c.json.tmp"), "{}").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        fs::create_dir(dir.path().join("2026")).unwrap();

        let names = list_document_names(dir.path()).unwrap();
        assert_eq!(names, vec!["a.json".to_string(), "b.json".to_string()]);
    }
}
