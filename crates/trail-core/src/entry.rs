use std::net::IpAddr;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::validate::Coordinates;

/// Format used for every timestamp written to the sinks.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const UNKNOWN: &str = "unknown";

/// Request metadata gathered by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client_addr: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// One validated, enriched location record.
///
/// Built only from [`Coordinates`], so a constructed entry always carries
/// finite `lat`/`lon`. Field order is the column order used by every sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationEntry {
    timestamp: String,
    lat: f64,
    lon: f64,
    ip: String,
    user_agent: String,
    referer: String,
}

impl LocationEntry {
    pub fn new(coords: Coordinates, context: &RequestContext, received_at: NaiveDateTime) -> Self {
        let ip = context
            .client_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let user_agent = context
            .user_agent
            .as_deref()
            .map(strip_line_breaks)
            .unwrap_or_else(|| UNKNOWN.to_string());

        let referer = context
            .referer
            .as_deref()
            .map(strip_line_breaks)
            .unwrap_or_default();

        Self {
            timestamp: received_at.format(TIMESTAMP_FORMAT).to_string(),
            lat: coords.lat,
            lon: coords.lon,
            ip,
            user_agent,
            referer,
        }
    }

    /// Build an entry stamped with the server's local time.
    pub fn now(coords: Coordinates, context: &RequestContext) -> Self {
        Self::new(coords, context, Local::now().naive_local())
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn referer(&self) -> &str {
        &self.referer
    }
}

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn local_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}
