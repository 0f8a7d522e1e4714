//! Progress notifications emitted by the migration runner

use serde::Serialize;

/// One progress notification. Percent is cumulative and never decreases
/// within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
    /// Name of the migration that just committed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<String>,
}

impl ProgressEvent {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
            migration: None,
        }
    }

    /// Attach the migration that just completed
    pub fn with_migration(mut self, name: impl Into<String>) -> Self {
        self.migration = Some(name.into());
        self
    }
}
