//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces the runner depends on. Adapters provide the
//! SQLite and discovery implementations.

mod progress;
mod source;
mod version_store;

pub use progress::{ProgressReporter, RecordingReporter};
pub use source::MigrationSource;
pub use version_store::VersionStore;
