//! Version store port - where the current schema version lives

use crate::domain::result::Result;

/// Reads and writes the single integer schema version of a database.
///
/// A version of 0 means the database has never been migrated. Implementations
/// bound to an open transaction must make `set_version` part of that
/// transaction.
pub trait VersionStore {
    /// Current schema version; 0 for a database that was never migrated
    fn current_version(&self) -> Result<u32>;

    /// Record `version` as the current schema version
    fn set_version(&self, version: u32) -> Result<()>;
}
