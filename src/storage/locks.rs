use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

static GLOBAL: OnceLock<PathLocks> = OnceLock::new();

/// Registry of per-file mutexes.
///
/// Every mutation of a document runs inside [`PathLocks::with_lock`] for its
/// path, so two read-modify-write sequences on the same file cannot interleave.
/// Different files never block each other. Collections share the
/// process-wide [`PathLocks::global`] registry, so separate handles opened on
/// one directory still serialize against each other.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every collection in the process
    pub fn global() -> &'static PathLocks {
        GLOBAL.get_or_init(PathLocks::new)
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = lock_key(path);
        // The maps only guard `()`, so a poisoned lock carries no broken state.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(key).or_default())
    }

    /// Run `f` while holding the lock for `path`
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }

    /// Number of paths that have been locked at least once
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Canonical form of `path` so different spellings of one file share a lock.
///
/// The file itself may not exist yet, so only the parent is resolved.
fn lock_key(path: &Path) -> PathBuf {
    let resolved = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            fs::canonicalize(parent).ok().map(|dir| dir.join(name))
        }
        _ => None,
    };
    resolved.unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_path_is_serialized() {
        let locks = Arc::new(PathLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..10 {
                        locks.with_lock(Path::new("/tmp/doc.json"), || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(1));
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked(), 1);
    }

    #[test]
    fn test_returns_closure_value() {
        let locks = PathLocks::new();
        let value = locks.with_lock(Path::new("a"), || 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_different_spellings_share_a_lock() {
        let dir = tempfile::TempDir::new().unwrap();
        let plain = dir.path().join("doc.json");
        let dotted = dir.path().join(".").join("doc.json");

        let locks = PathLocks::new();
        locks.with_lock(&plain, || ());
        locks.with_lock(&dotted, || ());
        assert_eq!(locks.tracked(), 1);
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(std::ptr::eq(PathLocks::global(), PathLocks::global()));
    }
}
