//! Error types for the persistent counter.
//!
//! Loading and persisting fail in different ways and carry different
//! consequences, so they are separate types: a [`LoadError`] is fatal and
//! prevents the counter from existing at all, while a [`PersistError`] is
//! reported after the in-memory value has already changed.

use std::num::ParseIntError;
use std::path::PathBuf;

/// Errors that can occur while loading a counter from its backing file.
///
/// A missing file is not an error (the counter starts at zero), so every
/// variant here means the process should refuse to start.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The backing file exists but could not be read (permission denied,
    /// path through a regular file, invalid UTF-8, ...).
    #[error("failed to read counter file {}: {source}", .path.display())]
    Io {
        /// The backing file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file was read but does not hold a decimal integer.
    #[error("counter file {} holds {content:?}, not an integer: {source}", .path.display())]
    Malformed {
        /// The backing file path.
        path: PathBuf,
        /// The whitespace-trimmed file content that failed to parse.
        content: String,
        /// The underlying parse error.
        source: ParseIntError,
    },
}

/// The backing file could not be written after a mutation.
///
/// The mutation itself is NOT rolled back: [`PersistError::value`] holds
/// the new in-memory value, which stays authoritative until the next
/// successful save.
#[derive(Debug, thiserror::Error)]
#[error("failed to persist counter value {value} to {}: {source}", .path.display())]
pub struct PersistError {
    /// The backing file path.
    pub path: PathBuf,
    /// The in-memory value after the mutation that failed to persist.
    pub value: i64,
    /// The underlying I/O error.
    pub source: std::io::Error,
}
