//! SQLite adapter
//!
//! Opening database files (with retry while another process holds a lock)
//! and the `PRAGMA user_version` backed [`VersionStore`].

use std::path::Path;
use std::thread;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::warn;

use crate::domain::result::{Error, Result};
use crate::ports::VersionStore;

/// Default number of attempts when the database file is locked
pub const DEFAULT_OPEN_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Upper bound on a single retry delay
const MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Backoff before retry number `attempt` (0-based), capped at [`MAX_RETRY_DELAY_MS`]
fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(INITIAL_RETRY_DELAY_MS.saturating_mul(factor).min(MAX_RETRY_DELAY_MS))
}

/// Check if an error indicates a locked or busy database that should be retried
fn is_retryable_error(err: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(code, _) = err {
        if matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return true;
        }
    }
    let lower = err.to_string().to_lowercase();
    lower.contains("database is locked") || lower.contains("resource temporarily unavailable")
}

/// Open (creating if needed) the SQLite database at `path`.
///
/// Retries with exponential backoff while SQLite reports the file as busy or
/// locked. A freshly created file is empty and reports version 0.
pub fn open(path: &Path, max_attempts: u32) -> Result<Connection> {
    let attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match try_open(path) {
            Ok(conn) => return Ok(conn),
            Err(e) if is_retryable_error(&e) && attempt + 1 < attempts => {
                let delay = retry_delay(attempt);
                warn!(
                    path = %path.display(),
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "database busy, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn try_open(path: &Path) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(path, flags)?;
    // Touch the schema so a locked file fails here rather than mid-run
    conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))?;
    Ok(conn)
}

/// [`VersionStore`] over SQLite's `PRAGMA user_version`.
///
/// Bind it to a `Transaction` (which derefs to `Connection`) and the version
/// write commits or rolls back with everything else in that transaction.
/// Survives dropping ordinary tables; lost only if the file is recreated.
pub struct UserVersion<'c> {
    conn: &'c Connection,
}

impl<'c> UserVersion<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl VersionStore for UserVersion<'_> {
    fn current_version(&self) -> Result<u32> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        u32::try_from(version)
            .map_err(|_| Error::other(format!("Database reports invalid user_version {}", version)))
    }

    fn set_version(&self, version: u32) -> Result<()> {
        self.conn.pragma_update(None, "user_version", version)?;
        Ok(())
    }
}
