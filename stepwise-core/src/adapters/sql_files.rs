//! SQL file migration source
//!
//! Treats every `*.sql` file in a directory as a migration. The file stem is
//! the migration name, so it must end in three digits (`001_initial.sql` is
//! not valid, `initial_001.sql` is). A file can split its body into hook
//! sections with marker lines:
//!
//! ```sql
//! -- stepwise:pre
//! CREATE TABLE person_backup AS SELECT * FROM person;
//! -- stepwise:migrate
//! DROP TABLE person;
//! CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
//! -- stepwise:post
//! INSERT INTO person (id, name) SELECT id, name FROM person_backup;
//! DROP TABLE person_backup;
//! -- stepwise:seed
//! INSERT OR IGNORE INTO person (id, name) VALUES (1, 'admin');
//! ```
//!
//! Text before the first marker belongs to `migrate`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Migration, MigrationDescriptor};
use crate::ports::MigrationSource;

const MARKER_PREFIX: &str = "-- stepwise:";

/// SQL for each hook of one file. Empty sections mean "no hook".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SqlSections {
    pub pre_migrate: String,
    pub migrate: String,
    pub post_migrate: String,
    pub seed: String,
}

impl SqlSections {
    /// Split a file body on `-- stepwise:<hook>` marker lines
    pub fn parse(name: &str, body: &str) -> Result<Self> {
        let mut sections = Self::default();
        let mut current = "migrate";

        for line in body.lines() {
            let trimmed = line.trim();
            if let Some(hook) = trimmed.strip_prefix(MARKER_PREFIX) {
                current = match hook.trim() {
                    "pre" | "pre_migrate" => "pre_migrate",
                    "migrate" => "migrate",
                    "post" | "post_migrate" => "post_migrate",
                    "seed" => "seed",
                    other => {
                        return Err(Error::configuration(format!(
                            "Migration {} uses unknown section marker '{}'",
                            name, other
                        )))
                    }
                };
                continue;
            }

            let target = match current {
                "pre_migrate" => &mut sections.pre_migrate,
                "post_migrate" => &mut sections.post_migrate,
                "seed" => &mut sections.seed,
                _ => &mut sections.migrate,
            };
            target.push_str(line);
            target.push('\n');
        }

        Ok(sections)
    }

    fn iter(&self) -> [(&'static str, &str); 4] {
        [
            ("pre_migrate", self.pre_migrate.as_str()),
            ("migrate", self.migrate.as_str()),
            ("post_migrate", self.post_migrate.as_str()),
            ("seed", self.seed.as_str()),
        ]
    }
}

/// Validate SQL syntax before it ever reaches the database.
///
/// sqlparser does not cover every SQLite statement (`PRAGMA x = ON` among
/// them), so a section it rejects is handed to [`sqlite_syntax_check`].
fn validate_sql_syntax(name: &str, sections: &SqlSections) -> Result<()> {
    let dialect = SQLiteDialect {};
    let mut rejected = None;

    for (hook, sql) in sections.iter() {
        if !has_statements(sql) {
            continue;
        }
        if let Err(e) = Parser::parse_sql(&dialect, sql) {
            let msg = e.to_string();
            let cleaned = msg.trim_start_matches("sql parser error: ").to_string();
            warn!(
                migration = name,
                section = hook,
                error = %cleaned,
                "sqlparser rejected section, checking with SQLite"
            );
            rejected = Some((hook, cleaned));
            break;
        }
    }

    match rejected {
        Some((hook, parser_error)) => sqlite_syntax_check(name, sections).map_err(|sqlite_error| {
            Error::configuration(format!(
                "Migration {} has invalid SQL in its {} section: {} ({})",
                name, hook, sqlite_error, parser_error
            ))
        }),
        None => Ok(()),
    }
}

/// Run every section in order on a scratch in-memory database.
///
/// Only syntax errors count. Anything else (a missing table, a constraint)
/// depends on the real schema and surfaces when the migration runs.
fn sqlite_syntax_check(name: &str, sections: &SqlSections) -> std::result::Result<(), String> {
    let scratch = rusqlite::Connection::open_in_memory().map_err(|e| e.to_string())?;

    for (hook, sql) in sections.iter() {
        if !has_statements(sql) {
            continue;
        }
        if let Err(e) = scratch.execute_batch(sql) {
            let msg = e.to_string();
            if is_syntax_error(&msg) {
                return Err(msg);
            }
            debug!(migration = name, section = hook, error = %msg, "scratch check stopped on a schema error");
            return Ok(());
        }
    }
    Ok(())
}

fn is_syntax_error(msg: &str) -> bool {
    msg.contains("syntax error") || msg.contains("incomplete input") || msg.contains("unrecognized token")
}

fn has_statements(sql: &str) -> bool {
    sql.lines().any(|l| {
        let t = l.trim();
        !t.is_empty() && !t.starts_with("--")
    })
}

/// Build a migration that executes each non-empty section as a batch
fn build_migration(name: &str, sections: &SqlSections) -> Result<Migration> {
    let mut migration = Migration::new(name)?;
    for (hook, sql) in sections.iter() {
        if !has_statements(sql) {
            continue;
        }
        let sql = sql.to_string();
        let run = move |db: &rusqlite::Connection| -> Result<()> {
            db.execute_batch(&sql)?;
            Ok(())
        };
        migration = match hook {
            "pre_migrate" => migration.pre_migrate(run),
            "post_migrate" => migration.post_migrate(run),
            "seed" => migration.seed(run),
            _ => migration.migrate(run),
        };
    }
    Ok(migration)
}

/// Discovers migrations from `*.sql` files in one directory
#[derive(Debug, Clone)]
pub struct SqlFileSource {
    dir: PathBuf,
}

impl SqlFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load one file into a descriptor
    fn load(&self, path: &Path, name: &str) -> Result<Option<MigrationDescriptor>> {
        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable migration file");
                return Ok(None);
            }
        };

        let sections = SqlSections::parse(name, &body)?;
        validate_sql_syntax(name, &sections)?;

        let sections = Arc::new(sections);
        let owned_name = name.to_string();
        let descriptor = MigrationDescriptor::new(name, move || {
            build_migration(&owned_name, &sections)
        })?;
        Ok(Some(descriptor))
    }
}

impl MigrationSource for SqlFileSource {
    fn discover(&self) -> Result<Vec<MigrationDescriptor>> {
        let mut descriptors = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!(path = %path.display(), "skipping migration file with non UTF-8 name");
                continue;
            };

            if let Some(descriptor) = self.load(&path, name)? {
                debug!(name = descriptor.name(), version = descriptor.version(), "discovered migration file");
                descriptors.push(descriptor);
            }
        }

        Ok(descriptors)
    }
}
