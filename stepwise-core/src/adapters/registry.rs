//! Manual migration registry
//!
//! The startup-time replacement for scanning loaded code: the application
//! registers each migration's name and a factory, and the registry hands the
//! descriptors to the catalog.
//!
//! ```ignore
//! let registry = Registry::new()
//!     .register("CreatePeople001", || {
//!         Migration::new("CreatePeople001").map(|m| m.migrate(create_people))
//!     })?;
//! ```

use crate::domain::result::Result;
use crate::domain::{Migration, MigrationDescriptor};
use crate::ports::MigrationSource;

/// Registered migrations, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: Vec<MigrationDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration factory under `name`. Fails immediately if the
    /// name doesn't carry a version.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Result<Self>
    where
        F: Fn() -> Result<Migration> + Send + Sync + 'static,
    {
        self.descriptors.push(MigrationDescriptor::new(name, factory)?);
        Ok(self)
    }

    /// Register an already-built descriptor
    pub fn add(&mut self, descriptor: MigrationDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl MigrationSource for Registry {
    fn discover(&self) -> Result<Vec<MigrationDescriptor>> {
        Ok(self.descriptors.clone())
    }
}
