//! The persistent counter.
//!
//! [`PersistentCounter`] owns a single `i64` behind a [`Mutex`] and a
//! backing file holding the same value as bare decimal text. Every
//! mutation is written to disk before the call returns.
//!
//! # Locking
//!
//! The guard is held across both the mutation and the save, so two saves
//! can never interleave and each save writes the value produced by its own
//! mutation. File I/O is blocking; async callers should run the mutating
//! operations on a blocking thread.
//!
//! # Overflow
//!
//! Arithmetic wraps: incrementing `i64::MAX` yields `i64::MIN` and
//! decrementing `i64::MIN` yields `i64::MAX`. There is no floor at zero.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{LoadError, PersistError};

/// How a save reaches the backing file.
///
/// Both modes produce the same file content; they differ only in what a
/// crash mid-write can leave behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Truncate the file and write the value in place. A crash mid-write
    /// can leave an empty or partial file.
    Overwrite,
    /// Write `<file>.tmp`, fsync it, then rename it over the backing file.
    #[default]
    Atomic,
}

/// A durable integer counter that is safe to share across threads.
#[derive(Debug)]
pub struct PersistentCounter {
    path: PathBuf,
    mode: WriteMode,
    value: Mutex<i64>,
}

impl PersistentCounter {
    /// Load a counter from `path` using the default [`WriteMode`].
    ///
    /// A missing file starts the counter at zero without creating it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        Self::open_with_mode(path, WriteMode::default())
    }

    /// Load a counter from `path`, persisting future mutations with `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the file exists but cannot be read, or
    /// [`LoadError::Malformed`] if its trimmed content is not an `i64`.
    pub fn open_with_mode(path: impl Into<PathBuf>, mode: WriteMode) -> Result<Self, LoadError> {
        let path = path.into();
        let value = load(&path)?;
        Ok(Self {
            path,
            mode,
            value: Mutex::new(value),
        })
    }

    /// The backing file path, fixed at construction.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current in-memory value.
    pub fn value(&self) -> i64 {
        *self.lock()
    }

    /// Add one and persist the result, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the save fails. The increment is kept
    /// in memory either way and the error carries the new value.
    pub fn increment(&self) -> Result<i64, PersistError> {
        self.apply(|value| value.wrapping_add(1))
    }

    /// Subtract one and persist the result, returning the new value.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentCounter::increment`].
    pub fn decrement(&self) -> Result<i64, PersistError> {
        self.apply(|value| value.wrapping_sub(1))
    }

    fn apply(&self, step: impl FnOnce(i64) -> i64) -> Result<i64, PersistError> {
        let mut guard = self.lock();
        let value = step(*guard);
        *guard = value;

        if let Err(source) = self.save(value) {
            warn!(
                path = %self.path.display(),
                value,
                error = %source,
                "counter changed in memory but was not persisted"
            );
            return Err(PersistError {
                path: self.path.clone(),
                value,
                source,
            });
        }

        debug!(path = %self.path.display(), value, "counter persisted");
        Ok(value)
    }

    /// Write `value` to the backing file. Callers must hold the lock.
    fn save(&self, value: i64) -> io::Result<()> {
        let contents = value.to_string();
        match self.mode {
            WriteMode::Overwrite => fs::write(&self.path, contents),
            WriteMode::Atomic => {
                let tmp = temp_path(&self.path);
                let written = write_synced(&tmp, contents.as_bytes())
                    .and_then(|()| fs::rename(&tmp, &self.path));
                if written.is_err() {
                    // Best effort; the original error is the one worth reporting.
                    let _ = fs::remove_file(&tmp);
                }
                written
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, i64> {
        // A panic while holding the guard cannot leave an `i64` half-written.
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(path: &Path) -> Result<i64, LoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "counter file not found, starting at 0");
            return Ok(0);
        }
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let content = raw.trim();
    let value = content
        .parse::<i64>()
        .map_err(|source| LoadError::Malformed {
            path: path.to_path_buf(),
            content: content.to_owned(),
            source,
        })?;

    info!(path = %path.display(), value, "counter loaded");
    Ok(value)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn scratch() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.txt");
        (dir, path)
    }

    #[test]
    fn missing_file_starts_at_zero() {
        let (_dir, path) = scratch();
        let counter = PersistentCounter::open(&path).unwrap();
        assert_eq!(counter.value(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn loads_existing_value() {
        let (_dir, path) = scratch();
        fs::write(&path, "42").unwrap();
        let counter = PersistentCounter::open(&path).unwrap();
        assert_eq!(counter.value(), 42);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let (_dir, path) = scratch();
        fs::write(&path, "  7\n").unwrap();
        let counter = PersistentCounter::open(&path).unwrap();
        assert_eq!(counter.value(), 7);
    }

    #[test]
    fn rejects_malformed_content() {
        let (_dir, path) = scratch();
        fs::write(&path, "abc").unwrap();
        let result = PersistentCounter::open(&path);
        assert!(matches!(result, Err(LoadError::Malformed { ref content, .. }) if content == "abc"));
    }

    #[test]
    fn rejects_empty_file() {
        let (_dir, path) = scratch();
        fs::write(&path, "").unwrap();
        assert!(matches!(
            PersistentCounter::open(&path),
            Err(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn unreadable_path_is_a_load_error_not_zero() {
        let (dir, _) = scratch();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "1").unwrap();
        let result = PersistentCounter::open(blocker.join("counter.txt"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn increment_then_decrement_returns_to_zero() {
        let (_dir, path) = scratch();
        let counter = PersistentCounter::open(&path).unwrap();
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.decrement().unwrap(), 0);
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn ten_increments() {
        let (_dir, path) = scratch();
        let counter = PersistentCounter::open(&path).unwrap();
        for _ in 0..10 {
            counter.increment().unwrap();
        }
        assert_eq!(counter.value(), 10);
        assert_eq!(fs::read_to_string(&path).unwrap(), "10");
    }

    #[test]
    fn decrement_below_zero_is_not_clamped() {
        let (_dir, path) = scratch();
        let counter = PersistentCounter::open(&path).unwrap();
        assert_eq!(counter.decrement().unwrap(), -1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "-1");
    }

    #[test]
    fn increment_wraps_at_max() {
        let (_dir, path) = scratch();
        fs::write(&path, i64::MAX.to_string()).unwrap();
        let counter = PersistentCounter::open(&path).unwrap();
        assert_eq!(counter.increment().unwrap(), i64::MIN);
    }

    #[test]
    fn reopen_sees_persisted_value() {
        let (_dir, path) = scratch();
        let first = PersistentCounter::open(&path).unwrap();
        first.increment().unwrap();
        first.increment().unwrap();

        let second = PersistentCounter::open(&path).unwrap();
        assert_eq!(second.value(), first.value());
    }

    #[test]
    fn both_write_modes_produce_the_same_file() {
        let (_dir, path) = scratch();
        let atomic = PersistentCounter::open_with_mode(&path, WriteMode::Atomic).unwrap();
        atomic.decrement().unwrap();
        let atomic_bytes = fs::read(&path).unwrap();

        fs::remove_file(&path).unwrap();
        let overwrite = PersistentCounter::open_with_mode(&path, WriteMode::Overwrite).unwrap();
        overwrite.decrement().unwrap();
        assert_eq!(fs::read(&path).unwrap(), atomic_bytes);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn failed_save_keeps_the_new_value() {
        let (dir, _) = scratch();
        let path = dir.path().join("missing").join("counter.txt");

        for mode in [WriteMode::Atomic, WriteMode::Overwrite] {
            let counter = PersistentCounter::open_with_mode(&path, mode).unwrap();
            let err = counter.increment().unwrap_err();
            assert_eq!(err.value, 1);
            assert_eq!(err.path, path);
            assert_eq!(counter.value(), 1);
        }
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (_dir, path) = scratch();
        let counter = Arc::new(PersistentCounter::open(&path).unwrap());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let counter = Arc::clone(&counter);
                scope.spawn(move || {
                    for _ in 0..25 {
                        counter.increment().unwrap();
                    }
                });
            }
        });

        assert_eq!(counter.value(), 200);
        assert_eq!(fs::read_to_string(&path).unwrap(), "200");
    }

    #[test]
    fn mixed_concurrent_mutations_balance_out() {
        let (_dir, path) = scratch();
        let counter = PersistentCounter::open_with_mode(&path, WriteMode::Overwrite).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..6 {
                let counter = &counter;
                scope.spawn(move || {
                    for _ in 0..20 {
                        if worker % 2 == 0 {
                            counter.increment().unwrap();
                        } else {
                            counter.decrement().unwrap();
                        }
                    }
                });
            }
        });

        assert_eq!(counter.value(), 0);
        assert_eq!(PersistentCounter::open(&path).unwrap().value(), 0);
    }
}
