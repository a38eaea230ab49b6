use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::{append_locked, LocationSink, SinkError};
use crate::entry::LocationEntry;

pub const CSV_FILE_NAME: &str = "locations.csv";

pub const CSV_HEADER: [&str; 6] = ["timestamp", "lat", "lon", "ip", "user_agent", "referer"];

/// CSV sink with a header row written once, ahead of the first data row.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CSV_FILE_NAME))
    }
}

fn write_rows(file: &mut File, entry: &LocationEntry) -> io::Result<()> {
    // Decided under the lock so that concurrent first writers agree on who
    // emits the header.
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    if needs_header {
        writer.write_record(CSV_HEADER).map_err(io::Error::from)?;
    }

    let lat = entry.lat().to_string();
    let lon = entry.lon().to_string();
    writer
        .write_record([
            entry.timestamp(),
            lat.as_str(),
            lon.as_str(),
            entry.ip(),
            entry.user_agent(),
            entry.referer(),
        ])
        .map_err(io::Error::from)?;

    writer.flush()
}

impl LocationSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &LocationEntry) -> Result<(), SinkError> {
        append_locked(&self.path, |file| write_rows(file, entry))
    }
}
