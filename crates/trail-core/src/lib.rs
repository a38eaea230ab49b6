//! Validation and multi-sink append logic for geotrail.
//!
//! A request body goes through [`validate::parse_coordinates`], is enriched
//! into a [`LocationEntry`], and is then appended by the [`LocationRecorder`]
//! to three independent sinks (human log, CSV, JSON lines). Sink failures are
//! reported back to the caller of [`LocationRecorder::record`] but never turn
//! into a failed acknowledgement.

pub mod entry;
pub mod notifier;
pub mod recorder;
pub mod response;
pub mod sinks;
pub mod validate;

pub use entry::{LocationEntry, RequestContext, TIMESTAMP_FORMAT};
pub use notifier::{DisabledNotifier, Notifier, NotifyOutcome, SendmailNotifier};
pub use recorder::{LocationRecorder, RecordReport};
pub use response::{Acknowledgement, SavedTo};
pub use sinks::{CsvSink, HumanLogSink, JsonlSink, LocationSink, SinkError};
pub use validate::{parse_coordinates, Coordinates, ValidationError};
