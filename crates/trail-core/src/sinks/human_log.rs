use std::io::Write;
use std::path::{Path, PathBuf};

use super::{append_locked, LocationSink, SinkError};
use crate::entry::{local_timestamp, LocationEntry};

pub const HUMAN_LOG_FILE_NAME: &str = "location_log.txt";

/// Pipe-delimited, one line per entry.
#[derive(Debug, Clone)]
pub struct HumanLogSink {
    path: PathBuf,
}

impl HumanLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(HUMAN_LOG_FILE_NAME))
    }

    /// Record a failure of another sink as an `ERROR:` line.
    pub fn append_error(&self, message: &str) -> Result<(), SinkError> {
        let line = format!("[{}] ERROR: {}\n", local_timestamp(), message);
        append_locked(&self.path, |file| file.write_all(line.as_bytes()))
    }
}

pub(crate) fn format_line(entry: &LocationEntry) -> String {
    format!(
        "[{}] Lat: {} | Lon: {} | IP: {} | UA: {} | Referer: {}\n",
        entry.timestamp(),
        entry.lat(),
        entry.lon(),
        entry.ip(),
        entry.user_agent(),
        entry.referer(),
    )
}

impl LocationSink for HumanLogSink {
    fn name(&self) -> &'static str {
        "human_log"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &LocationEntry) -> Result<(), SinkError> {
        let line = format_line(entry);
        append_locked(&self.path, |file| file.write_all(line.as_bytes()))
    }
}
