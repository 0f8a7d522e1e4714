//! Migration runner - brings a database up to the latest schema version
//!
//! One run reads the stored version, picks the applicable migrations, builds
//! all of them, then executes each in its own transaction:
//!
//! 1. `pre_migrate`, `migrate`, `post_migrate`, `seed`
//! 2. `PRAGMA user_version = <migration version>`
//! 3. commit, then notify reporters
//!
//! A failure in any step rolls back that migration's transaction and ends the
//! run. Migrations committed before it stay applied, so running again after
//! fixing the failing migration resumes from where the run stopped.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::adapters::sqlite::UserVersion;
use crate::domain::result::{Error, Result};
use crate::domain::{schema, ColumnInfo, Migration, MigrationDescriptor, ProgressEvent, TableInfo};
use crate::ports::{MigrationSource, ProgressReporter, VersionStore};
use crate::services::catalog::{is_applicable, ExplicitCatalog, MigrationCatalog};

const START_MESSAGE: &str = "Checking database...";
const DONE_MESSAGE: &str = "Database check complete...";

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitialiseOutcome {
    /// Stored version before the run
    pub initial_version: u32,
    /// Stored version after the run
    pub final_version: u32,
    /// Versions executed by this run, in order
    pub applied: Vec<u32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InitialiseOutcome {
    /// `(initial_version, final_version)`
    pub fn versions(&self) -> (u32, u32) {
        (self.initial_version, self.final_version)
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Even progress step so the last of `count` migrations lands near 100
fn increment_for(count: usize) -> u8 {
    if count == 0 {
        0
    } else {
        (100 / count).min(100) as u8
    }
}

/// Drives migrations against one connection.
///
/// The runner borrows the connection mutably for its whole lifetime: nothing
/// else may write to the database while it runs.
pub struct MigrationRunner<'a> {
    conn: &'a mut Connection,
    source: Box<dyn MigrationSource + 'a>,
    reporters: Vec<Box<dyn ProgressReporter + 'a>>,
}

impl<'a> MigrationRunner<'a> {
    /// Bind a runner to an open connection and the source used by [`initialise`].
    ///
    /// [`initialise`]: MigrationRunner::initialise
    pub fn new(conn: &'a mut Connection, source: impl MigrationSource + 'a) -> Self {
        Self {
            conn,
            source: Box::new(source),
            reporters: Vec::new(),
        }
    }

    /// Add a progress observer. Observers are notified in the order added.
    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'a) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// Current stored schema version (0 if never migrated)
    pub fn current_version(&self) -> Result<u32> {
        UserVersion::new(&*self.conn).current_version()
    }

    /// Run every applicable migration offered by the runner's source.
    ///
    /// Applicability is checked again before each migration against the
    /// version the previous one left behind.
    pub fn initialise(&mut self) -> Result<InitialiseOutcome> {
        let started_at = Utc::now();
        let initial_version = self.start()?;

        let catalog = MigrationCatalog::discover(self.source.as_ref())?;
        let selected = catalog.applicable(initial_version);
        info!(
            initial_version,
            available = catalog.len(),
            selected = selected.len(),
            "starting migration run"
        );

        // Build every unit before the first transaction so a factory error
        // leaves the database untouched
        let units = selected
            .into_iter()
            .map(MigrationDescriptor::instantiate)
            .collect::<Result<Vec<_>>>()?;

        let increment = increment_for(units.len());
        let mut percent: u8 = 0;
        let mut applied = Vec::new();

        for migration in units {
            let current = self.current_version()?;
            let mut event = ProgressEvent::new(0, format!("Migration {}", migration.version()));

            if is_applicable(migration.version(), current) {
                self.execute(&migration)?;
                applied.push(migration.version());
                event = event.with_migration(migration.name());
            } else {
                debug!(
                    migration = migration.name(),
                    version = migration.version(),
                    current,
                    "skipping migration already covered by stored version"
                );
            }
            drop(migration);

            percent = percent.saturating_add(increment);
            event.percent = percent;
            self.notify(&event);
        }

        self.finish(initial_version, applied, started_at)
    }

    /// Run a caller-built sequence of migrations.
    ///
    /// The sequence must be non-empty and strictly ascending. Every unit runs:
    /// there is no check against the stored version, so callers pass only the
    /// migrations still to apply. With `dispose_after` each unit is dropped as
    /// soon as it has run; otherwise all are dropped when the run ends.
    pub fn initialise_with(
        &mut self,
        units: Vec<Migration>,
        dispose_after: bool,
    ) -> Result<InitialiseOutcome> {
        let started_at = Utc::now();
        let initial_version = self.start()?;

        let catalog = ExplicitCatalog::new(units)?;
        info!(
            initial_version,
            selected = catalog.len(),
            "starting explicit migration run"
        );

        let increment = increment_for(catalog.len());
        let mut percent: u8 = 0;
        let mut applied = Vec::new();
        let mut retained = Vec::new();

        for migration in catalog.into_units() {
            self.execute(&migration)?;
            applied.push(migration.version());

            percent = percent.saturating_add(increment);
            let event = ProgressEvent::new(percent, format!("Migration {}", migration.version()))
                .with_migration(migration.name());

            if dispose_after {
                drop(migration);
            } else {
                retained.push(migration);
            }
            self.notify(&event);
        }
        drop(retained);

        self.finish(initial_version, applied, started_at)
    }

    /// Async form of [`initialise`](MigrationRunner::initialise). Runs the
    /// same sequential steps; migrations never run concurrently.
    pub async fn initialise_async(&mut self) -> Result<InitialiseOutcome> {
        tokio::task::yield_now().await;
        self.initialise()
    }

    /// Async form of [`initialise_with`](MigrationRunner::initialise_with)
    pub async fn initialise_with_async(
        &mut self,
        units: Vec<Migration>,
        dispose_after: bool,
    ) -> Result<InitialiseOutcome> {
        tokio::task::yield_now().await;
        self.initialise_with(units, dispose_after)
    }

    /// Migrations a discovery run would select right now
    pub fn pending(&self) -> Result<Vec<MigrationDescriptor>> {
        let current = self.current_version()?;
        let catalog = MigrationCatalog::discover(self.source.as_ref())?;
        Ok(catalog.applicable(current).into_iter().cloned().collect())
    }

    /// True if the database has no tables at all
    pub fn is_blank_database(&self) -> Result<bool> {
        Ok(schema::tables(&*self.conn)?.is_empty())
    }

    /// Names of all tables
    pub fn table_names(&self) -> Result<BTreeSet<String>> {
        Ok(schema::tables(&*self.conn)?.into_iter().map(|t| t.name).collect())
    }

    /// Column names of `table` in declaration order
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        Ok(schema::table_info(&*self.conn, table)?
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Full `sqlite_master` rows for all tables
    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        schema::tables(&*self.conn)
    }

    /// Full `PRAGMA table_info` rows for `table`
    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        schema::table_info(&*self.conn, table)
    }

    fn start(&mut self) -> Result<u32> {
        let initial_version = self.current_version()?;
        self.notify(&ProgressEvent::new(0, START_MESSAGE));
        Ok(initial_version)
    }

    fn finish(
        &mut self,
        initial_version: u32,
        applied: Vec<u32>,
        started_at: DateTime<Utc>,
    ) -> Result<InitialiseOutcome> {
        let final_version = self.current_version()?;
        self.notify(&ProgressEvent::new(100, DONE_MESSAGE));

        let outcome = InitialiseOutcome {
            initial_version,
            final_version,
            applied,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            initial_version,
            final_version,
            applied = outcome.applied.len(),
            "migration run complete"
        );
        Ok(outcome)
    }

    /// Run one migration and its version update in a single transaction
    fn execute(&mut self, migration: &Migration) -> Result<()> {
        let name = migration.name().to_string();
        let version = migration.version();

        self.execute_in_transaction(migration).map_err(|e| {
            error!(migration = %name, version, error = %e, "migration failed, rolled back");
            Error::migration(name.clone(), version, e)
        })?;

        info!(migration = %name, version, "applied migration");
        Ok(())
    }

    fn execute_in_transaction(&mut self, migration: &Migration) -> Result<()> {
        let tx = self.conn.transaction()?;

        let outcome = migration
            .run_hooks(&tx)
            .and_then(|_| UserVersion::new(&tx).set_version(migration.version()));

        match outcome {
            Ok(()) => {
                tx.commit()?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }

    fn notify(&mut self, event: &ProgressEvent) {
        for reporter in self.reporters.iter_mut() {
            reporter.report(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Registry;
    use crate::ports::RecordingReporter;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn create_table(name: &'static str, table: &'static str) -> Result<Migration> {
        Ok(Migration::new(name)?.migrate(move |db| {
            db.execute_batch(&format!("CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY);", table))?;
            Ok(())
        }))
    }

    fn registry(names: &[(&'static str, &'static str)]) -> Registry {
        let mut registry = Registry::new();
        for (name, table) in names.iter().copied() {
            registry = registry.register(name, move || create_table(name, table)).unwrap();
        }
        registry
    }

    #[test]
    fn test_increment_for() {
        assert_eq!(increment_for(0), 0);
        assert_eq!(increment_for(1), 100);
        assert_eq!(increment_for(3), 33);
        assert_eq!(increment_for(250), 0);
    }

    #[test]
    fn test_discovery_applies_in_ascending_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        let source = registry(&[("C003", "c"), ("A001", "a"), ("B002", "b")]);

        let outcome = MigrationRunner::new(&mut conn, source).initialise().unwrap();

        assert_eq!(outcome.applied, vec![1, 2, 3]);
        assert_eq!(outcome.versions(), (0, 3));
    }

    #[test]
    fn test_discovery_with_gaps_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        let source = registry(&[("A001", "a"), ("E005", "e"), ("I009", "i")]);

        let outcome = MigrationRunner::new(&mut conn, source).initialise().unwrap();

        assert_eq!(outcome.applied, vec![1, 5, 9]);
        assert_eq!(outcome.final_version, 9);
    }

    #[test]
    fn test_discovery_skips_already_applied() {
        let mut conn = Connection::open_in_memory().unwrap();
        UserVersion::new(&conn).set_version(2).unwrap();
        let source = registry(&[("A001", "a"), ("B002", "b"), ("C003", "c")]);

        let mut runner = MigrationRunner::new(&mut conn, source);
        assert_eq!(runner.pending().unwrap().len(), 1);
        let outcome = runner.initialise().unwrap();

        assert_eq!(outcome.applied, vec![3]);
        assert_eq!(outcome.versions(), (2, 3));
        assert_eq!(runner.table_names().unwrap(), BTreeSet::from(["c".to_string()]));
    }

    #[test]
    fn test_each_run_instantiates_fresh_units() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let source = Registry::new()
            .register("Only001", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Migration::new("Only001")
            })
            .unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        MigrationRunner::new(&mut conn, &source).initialise().unwrap();
        MigrationRunner::new(&mut conn, &source).initialise().unwrap();

        // The second run has nothing to do and must not build anything
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_failure_rolls_back_and_stops() {
        let reached = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&reached);
        let source = Registry::new()
            .register("Good001", || create_table("Good001", "good"))
            .unwrap()
            .register("Bad002", || {
                Ok(Migration::new("Bad002")?.migrate(|db| {
                    db.execute_batch("CREATE TABLE bad (id INTEGER);")?;
                    Err(Error::other("exploded"))
                }))
            })
            .unwrap()
            .register("Never003", move || {
                let flag = Arc::clone(&flag);
                Ok(Migration::new("Never003")?.migrate(move |_| {
                    flag.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
            })
            .unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        let mut runner = MigrationRunner::new(&mut conn, source);
        let err = runner.initialise().unwrap_err();

        assert_eq!(err.failed_migration(), Some("Bad002"));
        assert_eq!(runner.current_version().unwrap(), 1);
        assert_eq!(runner.table_names().unwrap(), BTreeSet::from(["good".to_string()]));
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_factory_failure_opens_no_transaction() {
        let source = Registry::new()
            .register("A001", || create_table("A001", "a"))
            .unwrap()
            .register("B002", || Err(Error::other("cannot build")))
            .unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        let mut runner = MigrationRunner::new(&mut conn, source);
        let err = runner.initialise().unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("B002"));
        assert_eq!(runner.current_version().unwrap(), 0);
        assert!(runner.is_blank_database().unwrap());
    }

    #[test]
    fn test_version_mismatch_opens_no_transaction() {
        let source = Registry::new()
            .register("A001", || create_table("A001", "a"))
            .unwrap()
            .register("B002", || Migration::new("B003"))
            .unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        let mut runner = MigrationRunner::new(&mut conn, source);
        let err = runner.initialise().unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(runner.current_version().unwrap(), 0);
        assert!(runner.is_blank_database().unwrap());
    }

    #[test]
    fn test_progress_sequence() {
        let mut conn = Connection::open_in_memory().unwrap();
        let source = registry(&[("A001", "a"), ("B002", "b"), ("C003", "c")]);
        let events = Rc::new(RefCell::new(RecordingReporter::new()));
        let sink = Rc::clone(&events);

        MigrationRunner::new(&mut conn, source)
            .with_reporter(move |e: &ProgressEvent| sink.borrow_mut().report(e))
            .initialise()
            .unwrap();

        let events = events.borrow();
        assert_eq!(events.percents(), vec![0, 33, 66, 99, 100]);
        assert_eq!(events.events[0].message, START_MESSAGE);
        assert_eq!(events.events[1].migration.as_deref(), Some("A001"));
        assert_eq!(events.events[4].message, DONE_MESSAGE);
    }

    #[test]
    fn test_progress_with_nothing_to_do() {
        let mut conn = Connection::open_in_memory().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let outcome = MigrationRunner::new(&mut conn, Registry::new())
            .with_reporter(move |e: &ProgressEvent| sink.borrow_mut().push(e.percent))
            .initialise()
            .unwrap();

        assert!(outcome.is_noop());
        assert_eq!(*seen.borrow(), vec![0, 100]);
    }

    #[test]
    fn test_explicit_dispose_timing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let unit = |name: &'static str| {
            let log = Arc::clone(&log);
            Migration::new(name).unwrap().on_dispose(move || log.lock().unwrap().push(name))
        };

        let mut conn = Connection::open_in_memory().unwrap();
        let progress = Rc::new(RefCell::new(Vec::new()));
        let (sink, dispose_log) = (Rc::clone(&progress), Arc::clone(&log));
        MigrationRunner::new(&mut conn, Registry::new())
            .with_reporter(move |_: &ProgressEvent| {
                sink.borrow_mut().push(dispose_log.lock().unwrap().len());
            })
            .initialise_with(vec![unit("A001"), unit("B002")], true)
            .unwrap();

        // Reporter saw each unit already disposed when its progress arrived
        assert_eq!(*progress.borrow(), vec![0, 1, 2, 2]);
        assert_eq!(*log.lock().unwrap(), vec!["A001", "B002"]);
    }

    #[test]
    fn test_explicit_without_dispose_keeps_units_until_end() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let unit = |name: &'static str| {
            let log = Arc::clone(&log);
            Migration::new(name).unwrap().on_dispose(move || log.lock().unwrap().push(name))
        };

        let mut conn = Connection::open_in_memory().unwrap();
        let progress = Rc::new(RefCell::new(Vec::new()));
        let (sink, dispose_log) = (Rc::clone(&progress), Arc::clone(&log));
        MigrationRunner::new(&mut conn, Registry::new())
            .with_reporter(move |_: &ProgressEvent| {
                sink.borrow_mut().push(dispose_log.lock().unwrap().len());
            })
            .initialise_with(vec![unit("A001"), unit("B002")], false)
            .unwrap();

        assert_eq!(*progress.borrow(), vec![0, 0, 0, 2]);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_explicit_runs_even_if_already_applied() {
        let mut conn = Connection::open_in_memory().unwrap();
        UserVersion::new(&conn).set_version(5).unwrap();

        let outcome = MigrationRunner::new(&mut conn, Registry::new())
            .initialise_with(vec![create_table("Old002", "old").unwrap()], true)
            .unwrap();

        assert_eq!(outcome.applied, vec![2]);
        assert_eq!(outcome.versions(), (5, 2));
    }

    #[test]
    fn test_explicit_ordering_checked_before_any_transaction() {
        let mut conn = Connection::open_in_memory().unwrap();
        let units = vec![
            create_table("A001", "a").unwrap(),
            create_table("C003", "c").unwrap(),
            create_table("B002", "b").unwrap(),
        ];

        let mut runner = MigrationRunner::new(&mut conn, Registry::new());
        let err = runner.initialise_with(units, true).unwrap_err();

        assert!(err.is_configuration());
        assert!(runner.is_blank_database().unwrap());
        assert_eq!(runner.current_version().unwrap(), 0);
    }

    #[test]
    fn test_blank_database_and_introspection() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut runner = MigrationRunner::new(&mut conn, Registry::new());
        assert!(runner.is_blank_database().unwrap());

        runner
            .initialise_with(
                vec![Migration::new("People001").unwrap().migrate(|db| {
                    db.execute_batch("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT);")?;
                    Ok(())
                })],
                true,
            )
            .unwrap();

        assert!(!runner.is_blank_database().unwrap());
        assert_eq!(runner.column_names("people").unwrap(), vec!["id", "name"]);
        assert_eq!(runner.columns("people").unwrap()[0].pk, 1);
        assert_eq!(runner.tables().unwrap().len(), 1);
    }
}
