//! Migration source port - the discovery boundary

use crate::domain::result::Result;
use crate::domain::MigrationDescriptor;

/// Yields the migrations available to a discovery run.
///
/// Sources hand back descriptors in any order; the catalog sorts and
/// validates them. Entries that can't be loaded at all should be skipped
/// (and logged) rather than failing the whole discovery.
pub trait MigrationSource {
    fn discover(&self) -> Result<Vec<MigrationDescriptor>>;
}

impl MigrationSource for Vec<MigrationDescriptor> {
    fn discover(&self) -> Result<Vec<MigrationDescriptor>> {
        Ok(self.clone())
    }
}

impl<S: MigrationSource + ?Sized> MigrationSource for &S {
    fn discover(&self) -> Result<Vec<MigrationDescriptor>> {
        (**self).discover()
    }
}
