//! Append-only file sinks.
//!
//! Every sink owns the path of one file and takes an exclusive advisory lock
//! for the span of a single append: open, lock, write, flush, unlock, close.
//! No lock is ever held across sinks.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::entry::LocationEntry;

mod csv_file;
mod human_log;
mod jsonl;

pub use csv_file::{CsvSink, CSV_FILE_NAME, CSV_HEADER};
pub use human_log::{HumanLogSink, HUMAN_LOG_FILE_NAME};
pub use jsonl::{JsonlSink, JSONL_FILE_NAME};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SinkError {
    pub fn is_open_failure(&self) -> bool {
        matches!(self, SinkError::Open { .. })
    }
}

/// A durable, append-only destination for location entries.
pub trait LocationSink: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn path(&self) -> &Path;

    fn append(&self, entry: &LocationEntry) -> Result<(), SinkError>;

    /// Bare file name reported back to clients.
    fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Open `path` for appending and run `write` while holding an exclusive lock.
///
/// The lock is released before returning whatever the outcome of `write`.
pub(crate) fn append_locked<F>(path: &Path, write: F) -> Result<(), SinkError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    FileExt::lock_exclusive(&file).map_err(|source| SinkError::Lock {
        path: path.to_path_buf(),
        source,
    })?;

    let written = write(&mut file).and_then(|()| file.flush());
    let unlocked = FileExt::unlock(&file);
    drop(file);

    written.map_err(|source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    if let Err(err) = unlocked {
        tracing::debug!("explicit unlock of {} failed: {}", path.display(), err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn append_locked_creates_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");

        append_locked(&path, |file| file.write_all(b"one\n")).unwrap();
        append_locked(&path, |file| file.write_all(b"two\n")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn append_locked_reports_open_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");

        let err = append_locked(&path, |_| Ok(())).unwrap_err();
        assert!(err.is_open_failure(), "{err}");
    }

    #[test]
    fn append_locked_reports_write_failure_and_releases_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let err = append_locked(&path, |_| Err(io::Error::other("boom"))).unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));

        let file = File::open(&path).unwrap();
        FileExt::try_lock_exclusive(&file).expect("lock was released");
    }
}
