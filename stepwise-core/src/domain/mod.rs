//! Core domain types
//!
//! Migration units, versions, progress events and schema rows. Pure data
//! plus the small amount of SQL needed to read schema metadata.

pub mod migration;
pub mod progress;
pub mod result;
pub mod schema;
pub mod version;

pub use migration::{Hook, Migration, MigrationDescriptor, MigrationFactory};
pub use progress::ProgressEvent;
pub use schema::{ColumnInfo, TableInfo};
pub use version::parse_version;
