//! Stepwise Core - ordered, transactional schema migrations for SQLite
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: migration units, versions, progress events, schema rows
//! - **ports**: traits for the version store, discovery and progress observers
//! - **services**: the catalog and the migration runner
//! - **adapters**: SQLite `user_version`, the manual registry, SQL file discovery
//!
//! Embedding in an application:
//!
//! ```ignore
//! use stepwise_core::{Migration, MigrationRunner, Registry};
//!
//! let registry = Registry::new().register("CreatePeople001", || {
//!     Ok(Migration::new("CreatePeople001")?.migrate(|db| {
//!         db.execute_batch("CREATE TABLE IF NOT EXISTS Person (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL);")?;
//!         Ok(())
//!     }))
//! })?;
//!
//! let mut conn = rusqlite::Connection::open("app.db")?;
//! let outcome = MigrationRunner::new(&mut conn, registry).initialise()?;
//! println!("schema version {} -> {}", outcome.initial_version, outcome.final_version);
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use adapters::SqlFileSource;
use config::Config;

// Re-export commonly used types at crate root
pub use adapters::{Registry, UserVersion};
pub use domain::result::Error;
pub use domain::{
    ColumnInfo, Migration, MigrationDescriptor, ProgressEvent, TableInfo,
};
pub use ports::{MigrationSource, ProgressReporter, RecordingReporter, VersionStore};
pub use services::{InitialiseOutcome, MigrationCatalog, MigrationRunner};

/// Main context for running migrations from configuration
///
/// Holds the open database and the settings it was opened with. Discovery
/// runs use the configured SQL migrations directory.
pub struct StepwiseContext {
    pub config: Config,
    conn: Connection,
}

impl StepwiseContext {
    /// Load configuration from `project_dir` and open its database
    pub fn new(project_dir: &Path) -> Result<Self> {
        let config = Config::load(project_dir)?;
        Self::open(config)
    }

    /// Open the database named by `config`, creating it if missing
    pub fn open(config: Config) -> Result<Self> {
        if let Some(parent) = config.database.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let conn = adapters::sqlite::open(&config.database, config.open_retries)
            .with_context(|| format!("Failed to open database: {}", config.database.display()))?;

        Ok(Self { config, conn })
    }

    /// Source over the configured migrations directory
    pub fn sql_source(&self) -> SqlFileSource {
        SqlFileSource::new(&self.config.migrations_dir)
    }

    /// Runner bound to this database and the configured SQL directory
    pub fn runner(&mut self) -> MigrationRunner<'_> {
        let source = SqlFileSource::new(&self.config.migrations_dir);
        MigrationRunner::new(&mut self.conn, source)
    }

    /// Runner bound to this database and a caller-supplied source
    pub fn runner_with<'a>(&'a mut self, source: impl MigrationSource + 'a) -> MigrationRunner<'a> {
        MigrationRunner::new(&mut self.conn, source)
    }

    /// Run caller-built migrations, disposing them per `config.dispose_after`
    pub fn initialise_with(&mut self, units: Vec<Migration>) -> Result<InitialiseOutcome> {
        let dispose_after = self.config.dispose_after;
        let outcome = self.runner().initialise_with(units, dispose_after)?;
        Ok(outcome)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
