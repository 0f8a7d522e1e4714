//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed migration names, bad catalogs, unusable sources.
    /// Always raised before any transaction is opened.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A migration hook failed and its transaction was rolled back
    #[error("Migration {name} could not be run: {source}")]
    Migration {
        name: String,
        version: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wrap the cause of a failed migration with the unit's identity
    pub fn migration(name: impl Into<String>, version: u32, source: Error) -> Self {
        Self::Migration {
            name: name.into(),
            version,
            source: Box::new(source),
        }
    }

    /// Create a free-form error, typically from inside a migration hook
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Name of the migration that failed, if this is a migration failure
    pub fn failed_migration(&self) -> Option<&str> {
        match self {
            Self::Migration { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
