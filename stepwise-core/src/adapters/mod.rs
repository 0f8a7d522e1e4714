//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - SQLite (`PRAGMA user_version`) for the VersionStore port
//! - A manual registry for the MigrationSource port
//! - A directory of `*.sql` files for the MigrationSource port

pub mod registry;
pub mod sql_files;
pub mod sqlite;

pub use registry::Registry;
pub use sql_files::{SqlFileSource, SqlSections};
pub use sqlite::UserVersion;
