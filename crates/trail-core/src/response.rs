use serde::Serialize;

use crate::notifier::NotifyOutcome;
use crate::validate::ValidationError;

/// File names of the three sinks, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedTo {
    pub human_log: String,
    pub csv: String,
    pub jsonl: String,
}

/// JSON body returned for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Acknowledgement {
    Saved {
        success: bool,
        saved_to: SavedTo,
        email: Option<NotifyOutcome>,
    },
    Rejected {
        success: bool,
        error: String,
    },
}

impl Acknowledgement {
    pub fn saved(saved_to: SavedTo, email: Option<NotifyOutcome>) -> Self {
        Acknowledgement::Saved {
            success: true,
            saved_to,
            email,
        }
    }

    pub fn rejected(err: ValidationError) -> Self {
        Acknowledgement::Rejected {
            success: false,
            error: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Acknowledgement::Saved { .. })
    }
}
