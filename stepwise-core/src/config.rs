//! Configuration management
//!
//! Settings live in an optional `stepwise.json` next to the project:
//! ```json
//! {
//!   "database": "app.db",
//!   "migrationsDir": "db/migrations",
//!   "disposeAfter": true,
//!   "openRetries": 5
//! }
//! ```
//! Unknown keys are preserved when the file is saved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::sqlite::DEFAULT_OPEN_RETRIES;

/// Name of the settings file looked up in the project directory
pub const SETTINGS_FILE: &str = "stepwise.json";

/// Environment variable overriding the database path
pub const DATABASE_ENV: &str = "STEPWISE_DATABASE";

/// Environment variable overriding the migrations directory
pub const MIGRATIONS_DIR_ENV: &str = "STEPWISE_MIGRATIONS_DIR";

/// Raw stepwise.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    migrations_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dispose_after: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    open_retries: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Stepwise configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file to migrate
    pub database: PathBuf,
    /// Directory holding `*.sql` migrations
    pub migrations_dir: PathBuf,
    /// Drop explicit-mode migrations as soon as they have run
    pub dispose_after: bool,
    /// Attempts to open a locked database before giving up
    pub open_retries: u32,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("stepwise.db"),
            migrations_dir: PathBuf::from("migrations"),
            dispose_after: true,
            open_retries: DEFAULT_OPEN_RETRIES,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from `project_dir`.
    ///
    /// Precedence: environment variables, then stepwise.json, then defaults.
    /// Relative paths in the file are resolved against `project_dir`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let settings_path = project_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let defaults = Config::default();
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { project_dir.join(p) };

        let database = match std::env::var_os(DATABASE_ENV) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => resolve(raw.database.clone().unwrap_or(defaults.database)),
        };
        let migrations_dir = match std::env::var_os(MIGRATIONS_DIR_ENV) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => resolve(raw.migrations_dir.clone().unwrap_or(defaults.migrations_dir)),
        };

        Ok(Self {
            database,
            migrations_dir,
            dispose_after: raw.dispose_after.unwrap_or(defaults.dispose_after),
            open_retries: raw.open_retries.unwrap_or(defaults.open_retries),
            _raw_settings: raw,
        })
    }

    /// Save config to `project_dir`, preserving keys stepwise doesn't manage
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let settings_path = project_dir.join(SETTINGS_FILE);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.database = Some(relative_to(&self.database, project_dir));
        settings.migrations_dir = Some(relative_to(&self.migrations_dir, project_dir));
        settings.dispose_after = Some(self.dispose_after);
        settings.open_retries = Some(self.open_retries);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
