//! Service layer - migration orchestration
//!
//! The catalog validates and orders migrations; the runner executes them
//! against a connection.

pub mod catalog;
pub mod runner;

pub use catalog::{ExplicitCatalog, MigrationCatalog};
pub use runner::{InitialiseOutcome, MigrationRunner};
