/// Artifacts: the expected hive files and what became of each one.
///
/// Re-exports the record/set data model and the loader that builds it.
pub mod loader;
pub mod record;

pub use loader::{ArtifactLoader, LoadError};
pub use record::{ArtifactCounts, ArtifactRecord, ArtifactSet, ArtifactStatus, HIVE_CATALOG};
