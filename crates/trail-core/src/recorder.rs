use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(target_family = "unix")]
use std::os::unix::fs::DirBuilderExt;

use crate::entry::{LocationEntry, RequestContext};
use crate::notifier::{DisabledNotifier, Notifier, NotifyOutcome};
use crate::response::{Acknowledgement, SavedTo};
use crate::sinks::{CsvSink, HumanLogSink, JsonlSink, LocationSink, SinkError};
use crate::validate::parse_coordinates;

const CSV_OPEN_FAILURE: &str = "cannot open CSV file";

/// Per-sink outcome of one [`LocationRecorder::record`] call.
#[derive(Debug)]
pub struct RecordReport {
    pub human_log: Result<(), SinkError>,
    pub csv: Result<(), SinkError>,
    pub jsonl: Result<(), SinkError>,
    pub email: Option<NotifyOutcome>,
}

impl RecordReport {
    pub fn failures(&self) -> usize {
        [&self.human_log, &self.csv, &self.jsonl]
            .iter()
            .filter(|result| result.is_err())
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Owns the three sinks of a log directory and the notifier.
pub struct LocationRecorder {
    log_dir: PathBuf,
    human_log: HumanLogSink,
    csv: CsvSink,
    jsonl: JsonlSink,
    notifier: Arc<dyn Notifier>,
}

impl LocationRecorder {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        Self {
            human_log: HumanLogSink::in_dir(&log_dir),
            csv: CsvSink::in_dir(&log_dir),
            jsonl: JsonlSink::in_dir(&log_dir),
            notifier: Arc::new(DisabledNotifier),
            log_dir,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn saved_to(&self) -> SavedTo {
        SavedTo {
            human_log: self.human_log.file_name(),
            csv: self.csv.file_name(),
            jsonl: self.jsonl.file_name(),
        }
    }

    /// Create the log directory (mode 0750 on unix) if it does not exist.
    pub fn ensure_log_dir(&self) -> io::Result<()> {
        if self.log_dir.is_dir() {
            return Ok(());
        }
        create_restricted_dir(&self.log_dir)
    }

    /// Append `entry` to every sink in order, then notify.
    ///
    /// Each sink is attempted regardless of the others. A CSV open failure is
    /// also written to the human log.
    pub fn record(&self, entry: &LocationEntry) -> RecordReport {
        if let Err(err) = self.ensure_log_dir() {
            tracing::warn!(
                "cannot create log directory {}: {}",
                self.log_dir.display(),
                err
            );
        }

        let human_log = attempt(&self.human_log, entry);

        let csv = attempt(&self.csv, entry);
        if matches!(&csv, Err(err) if err.is_open_failure()) {
            if let Err(err) = self.human_log.append_error(CSV_OPEN_FAILURE) {
                tracing::warn!("cannot report CSV failure to human log: {}", err);
            }
        }

        let jsonl = attempt(&self.jsonl, entry);
        let email = self.notifier.notify(entry);

        RecordReport {
            human_log,
            csv,
            jsonl,
            email,
        }
    }

    /// Validate `body`, record it, and build the client acknowledgement.
    pub fn handle(&self, body: &[u8], context: &RequestContext) -> Acknowledgement {
        let coords = match parse_coordinates(body) {
            Ok(coords) => coords,
            Err(err) => {
                tracing::debug!("rejected location payload: {}", err);
                return Acknowledgement::rejected(err);
            }
        };

        let entry = LocationEntry::now(coords, context);
        let report = self.record(&entry);
        if !report.is_clean() {
            tracing::warn!(
                "location recorded with {} failed sink(s)",
                report.failures()
            );
        }

        Acknowledgement::saved(self.saved_to(), report.email)
    }
}

#[cfg(target_family = "unix")]
fn create_restricted_dir(path: &Path) -> io::Result<()> {
    std::fs::DirBuilder::new()
        .mode(0o750)
        .recursive(true)
        .create(path)
}

#[cfg(not(target_family = "unix"))]
fn create_restricted_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

fn attempt(sink: &dyn LocationSink, entry: &LocationEntry) -> Result<(), SinkError> {
    let result = sink.append(entry);
    if let Err(err) = &result {
        tracing::warn!("{} sink append failed: {}", sink.name(), err);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{CSV_FILE_NAME, HUMAN_LOG_FILE_NAME, JSONL_FILE_NAME};
    use std::fs;
    use tempfile::tempdir;

    struct FixedNotifier(NotifyOutcome);

    impl Notifier for FixedNotifier {
        fn notify(&self, _entry: &LocationEntry) -> Option<NotifyOutcome> {
            Some(self.0)
        }
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path)
            .map(|contents| contents.lines().count())
            .unwrap_or(0)
    }

    #[test]
    fn valid_request_reaches_every_sink() {
        let dir = tempdir().unwrap();
        let recorder = LocationRecorder::new(dir.path().join("logs"));

        let body = br#"{"lat": "31.2", "lon": "29.9"}"#;
        let ack = recorder.handle(body, &RequestContext::default());

        assert_eq!(ack, Acknowledgement::saved(recorder.saved_to(), None));
        let logs = recorder.log_dir();
        assert_eq!(line_count(&logs.join(HUMAN_LOG_FILE_NAME)), 1);
        assert_eq!(line_count(&logs.join(CSV_FILE_NAME)), 2);
        assert_eq!(line_count(&logs.join(JSONL_FILE_NAME)), 1);

        let csv = fs::read_to_string(logs.join(CSV_FILE_NAME)).unwrap();
        assert!(csv.lines().nth(1).unwrap().contains(",31.2,29.9,"));
    }

    #[test]
    fn rejected_request_touches_nothing() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let recorder = LocationRecorder::new(&logs);

        let ack = recorder.handle(br#"{"lat": "abc", "lon": 1}"#, &RequestContext::default());
        assert_eq!(
            ack,
            Acknowledgement::rejected(crate::ValidationError::InvalidCoordinate)
        );

        let ack = recorder.handle(b"{}", &RequestContext::default());
        assert!(!ack.is_success());
        assert!(!logs.exists());
    }

    #[test]
    fn csv_open_failure_is_logged_and_swallowed() {
        let dir = tempdir().unwrap();
        let recorder = LocationRecorder::new(dir.path());
        fs::create_dir(dir.path().join(CSV_FILE_NAME)).unwrap();

        let entry = LocationEntry::now(
            crate::Coordinates { lat: 1.0, lon: 2.0 },
            &RequestContext::default(),
        );
        let report = recorder.record(&entry);

        assert!(report.human_log.is_ok());
        assert!(report.csv.as_ref().unwrap_err().is_open_failure());
        assert!(report.jsonl.is_ok());
        assert_eq!(report.failures(), 1);

        let human = fs::read_to_string(dir.path().join(HUMAN_LOG_FILE_NAME)).unwrap();
        let lines: Vec<&str> = human.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("ERROR: cannot open CSV file"));

        let ack = recorder.handle(br#"{"lat": 1, "lon": 2}"#, &RequestContext::default());
        assert!(ack.is_success());
    }

    #[test]
    fn jsonl_failure_is_absorbed() {
        let dir = tempdir().unwrap();
        let recorder = LocationRecorder::new(dir.path());
        fs::create_dir(dir.path().join(JSONL_FILE_NAME)).unwrap();

        let entry = LocationEntry::now(
            crate::Coordinates { lat: 1.0, lon: 2.0 },
            &RequestContext::default(),
        );
        let report = recorder.record(&entry);
        assert!(report.human_log.is_ok());
        assert!(report.csv.is_ok());
        assert!(report.jsonl.is_err());
        assert_eq!(report.failures(), 1);

        let ack = recorder.handle(br#"{"lat": 1, "lon": 2}"#, &RequestContext::default());
        assert_eq!(ack, Acknowledgement::saved(recorder.saved_to(), None));
        assert_eq!(line_count(&dir.path().join(CSV_FILE_NAME)), 3);
    }

    #[test]
    fn human_log_failure_is_absorbed() {
        let dir = tempdir().unwrap();
        let recorder = LocationRecorder::new(dir.path());
        fs::create_dir(dir.path().join(HUMAN_LOG_FILE_NAME)).unwrap();

        let entry = LocationEntry::now(
            crate::Coordinates { lat: -3.5, lon: 0.0 },
            &RequestContext::default(),
        );
        let report = recorder.record(&entry);
        assert!(report.human_log.is_err());
        assert!(report.csv.is_ok());
        assert!(report.jsonl.is_ok());

        let ack = recorder.handle(br#"{"lat": -3.5, "lon": 0}"#, &RequestContext::default());
        assert!(ack.is_success());
        assert_eq!(line_count(&dir.path().join(JSONL_FILE_NAME)), 2);
    }

    #[test]
    fn notifier_outcome_is_reported() {
        let dir = tempdir().unwrap();
        let recorder = LocationRecorder::new(dir.path())
            .with_notifier(Arc::new(FixedNotifier(NotifyOutcome::Sent)));

        let ack = recorder.handle(br#"{"lat": 0, "lon": 0}"#, &RequestContext::default());
        assert_eq!(
            ack,
            Acknowledgement::saved(recorder.saved_to(), Some(NotifyOutcome::Sent))
        );
    }

    #[cfg(target_family = "unix")]
    #[test]
    fn log_dir_is_created_with_restricted_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let logs = dir.path().join("nested").join("logs");
        let recorder = LocationRecorder::new(&logs);
        recorder.ensure_log_dir().unwrap();

        let mode = fs::metadata(&logs).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & 0o007, 0);
        assert!(logs.is_dir());
    }
}
