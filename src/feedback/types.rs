use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Field injected into every record: identifies the recorder's session
pub const SESSION_ID_FIELD: &str = "session_id";
/// Field injected into every record: unique per `append` call
pub const EVENT_ID_FIELD: &str = "event_id";

/// What the scheduler does with local files once their content is confirmed remote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep every local file indefinitely
    #[default]
    Keep,
    /// Remove files whose exact published content is still what is on disk,
    /// except the active session log
    RemoveConfirmed,
}

impl std::str::FromStr for RetentionPolicy {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "remove_confirmed" | "remove-confirmed" => Ok(Self::RemoveConfirmed),
            other => Err(FeedbackError::Config(format!(
                "unknown retention policy: {other}"
            ))),
        }
    }
}

/// One file as seen by a folder snapshot: its length is fixed at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub name: String,
    pub len: u64,
    pub modified: Option<std::time::SystemTime>,
}

/// Errors surfaced by the recorder, the publishers and configuration
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Publish failed: {0}")]
    Publish(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for FeedbackError {
    fn from(e: reqwest::Error) -> Self {
        FeedbackError::Publish(e.to_string())
    }
}
