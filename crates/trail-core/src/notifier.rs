//! Optional email notification for recorded locations.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::entry::LocationEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyOutcome {
    Sent,
    Failed,
}

/// Collaborator invoked once per recorded entry.
///
/// `None` means the notifier is disabled and nothing was attempted.
pub trait Notifier: Send + Sync {
    fn notify(&self, entry: &LocationEntry) -> Option<NotifyOutcome>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn notify(&self, _entry: &LocationEntry) -> Option<NotifyOutcome> {
        None
    }
}

/// Hands a plain-text summary to a local `sendmail`-compatible binary.
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    sendmail_path: PathBuf,
    from: String,
    to: String,
}

impl SendmailNotifier {
    pub fn new(
        sendmail_path: impl Into<PathBuf>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            sendmail_path: sendmail_path.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Full RFC 5322 message, headers included.
    pub fn compose(&self, entry: &LocationEntry) -> String {
        let (lat, lon) = (entry.lat(), entry.lon());
        format!(
            "From: {from}\r\n\
             To: {to}\r\n\
             Subject: Location recorded - {ts}\r\n\
             Content-Type: text/plain; charset=UTF-8\r\n\
             \r\n\
             A new location was recorded:\n\n\
             Latitude: {lat}\n\
             Longitude: {lon}\n\n\
             Google Maps: https://www.google.com/maps?q={lat},{lon}\n\n\
             IP: {ip}\n\
             User-Agent: {ua}\n\
             Referer: {referer}\n\
             Time: {ts}\n",
            from = self.from,
            to = self.to,
            ts = entry.timestamp(),
            ip = entry.ip(),
            ua = entry.user_agent(),
            referer = entry.referer(),
        )
    }

    fn deliver(&self, message: &str) -> std::io::Result<bool> {
        let mut child = Command::new(&self.sendmail_path)
            .args(["-t", "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(message.as_bytes()),
            None => Err(std::io::Error::other("sendmail stdin unavailable")),
        };

        let status = child.wait()?;
        written?;
        Ok(status.success())
    }
}

impl Notifier for SendmailNotifier {
    fn notify(&self, entry: &LocationEntry) -> Option<NotifyOutcome> {
        let outcome = match self.deliver(&self.compose(entry)) {
            Ok(true) => NotifyOutcome::Sent,
            Ok(false) => {
                tracing::warn!(
                    "{} exited with a failure status",
                    self.sendmail_path.display()
                );
                NotifyOutcome::Failed
            }
            Err(err) => {
                tracing::warn!(
                    "email notification via {} failed: {}",
                    self.sendmail_path.display(),
                    err
                );
                NotifyOutcome::Failed
            }
        };
        Some(outcome)
    }
}
