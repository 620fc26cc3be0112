/// Compatibility resolution: which discovered plugins can run.
///
/// A plugin is compatible iff every hive it requires is `Loaded`. There is
/// no partial credit: one missing or failed requirement, or a requirement
/// naming a hive outside the catalog, makes it incompatible. Resolution is
/// pure and preserves discovery order in both partitions.
use crate::artifact::{ArtifactSet, ArtifactStatus};
use crate::plugin::PluginCatalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The two partitions, as ordered plugin ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub compatible: Vec<String>,
    pub incompatible: Vec<String>,
}

/// `true` iff every name in `requirements` is loaded in `artifacts`.
/// An empty requirement set is always satisfied.
pub fn is_compatible(artifacts: &ArtifactSet, requirements: &BTreeSet<String>) -> bool {
    requirements
        .iter()
        .all(|name| artifacts.status(name) == Some(ArtifactStatus::Loaded))
}

/// Partition `catalog` against `artifacts`.
pub fn resolve(artifacts: &ArtifactSet, catalog: &PluginCatalog) -> Resolution {
    let mut resolution = Resolution::default();
    for descriptor in catalog.iter() {
        let bucket = if is_compatible(artifacts, descriptor.requirements()) {
            &mut resolution.compatible
        } else {
            &mut resolution.incompatible
        };
        bucket.push(descriptor.id().to_string());
    }
    resolution
}
