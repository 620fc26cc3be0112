/// Registry hive parsing: the boundary between the loader and the bytes.
///
/// The loader never parses files itself; it goes through [`HiveOpener`].
/// [`RegfOpener`] is the production implementation backed by the
/// read-only [`Hive`] reader in this module. Tests swap in stubs.
pub mod error;
pub mod reader;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod value;

pub use error::HiveError;
pub use reader::{Hive, Key};
pub use value::{reg_types, RegValue};

use std::path::Path;

/// Capability to turn a file on disk into a parsed hive.
pub trait HiveOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Hive, HiveError>;
}

/// Opens `regf` hive files with [`Hive::open`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RegfOpener;

impl HiveOpener for RegfOpener {
    fn open(&self, path: &Path) -> Result<Hive, HiveError> {
        Hive::open(path)
    }
}
