//! Migration units
//!
//! A [`Migration`] is a versioned set of four optional hooks. Authors fill in
//! only the hooks they need; the rest are no-ops:
//!
//! - `pre_migrate`: preserve data ahead of destructive DDL (copy aside)
//! - `migrate`: change the schema; the only hook responsible for leaving it consistent
//! - `post_migrate`: restore or reshape preserved data (copy back, clean up)
//! - `seed`: populate data; runs last
//!
//! All four run inside the same transaction, together with the version update.

use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;

use super::result::{Error, Result};
use super::version::parse_version;

/// A single hook body. Receives the connection the unit's transaction is open on.
pub type Hook = Box<dyn Fn(&Connection) -> Result<()> + Send>;

/// Hook names in execution order
pub const HOOK_ORDER: [&str; 4] = ["pre_migrate", "migrate", "post_migrate", "seed"];

/// One versioned, atomic schema change
pub struct Migration {
    name: String,
    version: u32,
    pre_migrate: Option<Hook>,
    migrate: Option<Hook>,
    post_migrate: Option<Hook>,
    seed: Option<Hook>,
    on_dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Migration {
    /// Create a migration with no hooks. The version comes from the last three
    /// characters of `name`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let version = parse_version(&name)?;
        Ok(Self {
            name,
            version,
            pre_migrate: None,
            migrate: None,
            post_migrate: None,
            seed: None,
            on_dispose: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Set the pre-migrate hook
    pub fn pre_migrate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Connection) -> Result<()> + Send + 'static,
    {
        self.pre_migrate = Some(Box::new(hook));
        self
    }

    /// Set the migrate hook
    pub fn migrate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Connection) -> Result<()> + Send + 'static,
    {
        self.migrate = Some(Box::new(hook));
        self
    }

    /// Set the post-migrate hook
    pub fn post_migrate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Connection) -> Result<()> + Send + 'static,
    {
        self.post_migrate = Some(Box::new(hook));
        self
    }

    /// Set the seed hook
    pub fn seed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Connection) -> Result<()> + Send + 'static,
    {
        self.seed = Some(Box::new(hook));
        self
    }

    /// Run `f` once when this unit is dropped
    pub fn on_dispose<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_dispose = Some(Box::new(f));
        self
    }

    pub fn run_pre_migrate(&self, db: &Connection) -> Result<()> {
        run_hook(&self.pre_migrate, db)
    }

    pub fn run_migrate(&self, db: &Connection) -> Result<()> {
        run_hook(&self.migrate, db)
    }

    pub fn run_post_migrate(&self, db: &Connection) -> Result<()> {
        run_hook(&self.post_migrate, db)
    }

    pub fn run_seed(&self, db: &Connection) -> Result<()> {
        run_hook(&self.seed, db)
    }

    /// Run all four hooks in order, stopping at the first failure
    pub fn run_hooks(&self, db: &Connection) -> Result<()> {
        self.run_pre_migrate(db)?;
        self.run_migrate(db)?;
        self.run_post_migrate(db)?;
        self.run_seed(db)
    }
}

fn run_hook(hook: &Option<Hook>, db: &Connection) -> Result<()> {
    match hook {
        Some(f) => f(db),
        None => Ok(()),
    }
}

impl Drop for Migration {
    fn drop(&mut self) {
        if let Some(f) = self.on_dispose.take() {
            f();
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("pre_migrate", &self.pre_migrate.is_some())
            .field("migrate", &self.migrate.is_some())
            .field("post_migrate", &self.post_migrate.is_some())
            .field("seed", &self.seed.is_some())
            .finish()
    }
}

/// Builds a fresh [`Migration`] for every run
pub type MigrationFactory = Arc<dyn Fn() -> Result<Migration> + Send + Sync>;

/// A discoverable migration: its name, the version parsed from that name,
/// and a factory to instantiate it when it is about to run.
#[derive(Clone)]
pub struct MigrationDescriptor {
    name: String,
    version: u32,
    factory: MigrationFactory,
}

impl MigrationDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Result<Self>
    where
        F: Fn() -> Result<Migration> + Send + Sync + 'static,
    {
        let name = name.into();
        let version = parse_version(&name)?;
        Ok(Self {
            name,
            version,
            factory: Arc::new(factory),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Build the migration. A factory that fails, or yields a unit whose
    /// version differs from the descriptor's, is a configuration error.
    pub fn instantiate(&self) -> Result<Migration> {
        let migration = (self.factory)().map_err(|e| {
            Error::configuration(format!(
                "Migration {} could not be instantiated: {}",
                self.name, e
            ))
        })?;

        if migration.version() != self.version {
            return Err(Error::configuration(format!(
                "Migration {} produced a unit with version {} instead of {}",
                self.name,
                migration.version(),
                self.version
            )));
        }

        Ok(migration)
    }
}

impl fmt::Debug for MigrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}
