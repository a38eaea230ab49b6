use std::io::Write;
use std::path::{Path, PathBuf};

use super::{append_locked, LocationSink, SinkError};
use crate::entry::LocationEntry;

pub const JSONL_FILE_NAME: &str = "locations.jsonl";

/// One JSON object per line. Non-ASCII text is written as-is.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(JSONL_FILE_NAME))
    }
}

impl LocationSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &LocationEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        append_locked(&self.path, |file| file.write_all(line.as_bytes()))
    }
}
