//! Migration catalog - validated, ordered migrations for one run
//!
//! Two ways in:
//! - [`MigrationCatalog::discover`]: descriptors from a [`MigrationSource`],
//!   sorted by version. Gaps are fine, duplicates are not.
//! - [`ExplicitCatalog::new`]: caller-built units that must already be in
//!   strictly ascending order. Nothing is reordered.
//!
//! Both fail with a configuration error before any transaction is opened.

use crate::domain::result::{Error, Result};
use crate::domain::{Migration, MigrationDescriptor};
use crate::ports::MigrationSource;

/// Discovery-mode catalog: descriptors in ascending version order
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    descriptors: Vec<MigrationDescriptor>,
}

impl MigrationCatalog {
    /// Collect, sort and validate everything `source` offers
    pub fn discover(source: &dyn MigrationSource) -> Result<Self> {
        Self::from_descriptors(source.discover()?)
    }

    pub fn from_descriptors(mut descriptors: Vec<MigrationDescriptor>) -> Result<Self> {
        descriptors.sort_by_key(|d| d.version());

        for pair in descriptors.windows(2) {
            if pair[0].version() == pair[1].version() {
                return Err(Error::configuration(format!(
                    "Migrations {} and {} share version {}",
                    pair[0].name(),
                    pair[1].name(),
                    pair[0].version()
                )));
            }
        }

        Ok(Self { descriptors })
    }

    /// Descriptors a run starting at `current` would consider: everything
    /// above `current`, or everything when the database was never migrated.
    pub fn applicable(&self, current: u32) -> Vec<&MigrationDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| is_applicable(d.version(), current))
            .collect()
    }

    pub fn descriptors(&self) -> &[MigrationDescriptor] {
        &self.descriptors
    }

    pub fn versions(&self) -> Vec<u32> {
        self.descriptors.iter().map(|d| d.version()).collect()
    }

    /// Highest version in the catalog, 0 when empty
    pub fn latest_version(&self) -> u32 {
        self.descriptors.last().map(|d| d.version()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// A unit is applicable if it is newer than the stored version, or if the
/// database was never migrated (stored version 0).
pub fn is_applicable(version: u32, current: u32) -> bool {
    version > current || current == 0
}

/// Explicit-mode catalog: caller-supplied units in strictly ascending order
#[derive(Debug)]
pub struct ExplicitCatalog {
    units: Vec<Migration>,
}

impl ExplicitCatalog {
    pub fn new(units: Vec<Migration>) -> Result<Self> {
        if units.is_empty() {
            return Err(Error::configuration(
                "A non-empty sequence of migrations must be provided",
            ));
        }

        for pair in units.windows(2) {
            if pair[1].version() <= pair[0].version() {
                return Err(Error::configuration(format!(
                    "Migration {} (version {}) is not in sequence after {} (version {})",
                    pair[1].name(),
                    pair[1].version(),
                    pair[0].name(),
                    pair[0].version()
                )));
            }
        }

        Ok(Self { units })
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn versions(&self) -> Vec<u32> {
        self.units.iter().map(|m| m.version()).collect()
    }

    pub fn into_units(self) -> Vec<Migration> {
        self.units
    }
}
