/// Analysis plugins: the contract, the registry of compiled-in
/// implementations, and manifest-driven discovery.
///
/// A plugin declares which hives it needs ([`AnalysisPlugin::requirements`])
/// and does its work in [`AnalysisPlugin::process`], writing exactly one
/// report named from its id and the run id. Plugins never see each other
/// and never mutate the artifact set.
pub mod builtin;
pub mod catalog;
pub mod registry;

pub use catalog::{CatalogError, PluginCatalog, PluginDescriptor, PluginManifest, MANIFEST_SUFFIX};
pub use registry::PluginRegistry;

use crate::artifact::ArtifactSet;
use crate::run_id::RunId;
use std::path::{Path, PathBuf};

/// Status code a plugin returns on success.
pub const STATUS_OK: i32 = 0;

/// Everything a plugin receives for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext<'a> {
    pub artifacts: &'a ArtifactSet,
    pub output_dir: &'a Path,
    pub run_id: &'a RunId,
    /// Name and version the plugin was discovered under, when the caller
    /// knows them (a manifest may rename a plugin).
    pub display_name: Option<&'a str>,
    pub display_version: Option<&'a str>,
}

impl<'a> PluginContext<'a> {
    pub fn new(artifacts: &'a ArtifactSet, output_dir: &'a Path, run_id: &'a RunId) -> Self {
        Self {
            artifacts,
            output_dir,
            run_id,
            display_name: None,
            display_version: None,
        }
    }

    pub fn with_identity(mut self, name: &'a str, version: &'a str) -> Self {
        self.display_name = Some(name);
        self.display_version = Some(version);
        self
    }

    /// Name and version to put in `plugin`'s report header.
    pub fn identity<'s>(&'s self, plugin: &'s dyn AnalysisPlugin) -> (&'s str, &'s str) {
        (
            self.display_name.unwrap_or(plugin.name()),
            self.display_version.unwrap_or(plugin.version()),
        )
    }

    /// `<output_dir>/<module_id>_<run_id>.txt`
    pub fn report_path(&self, module_id: &str) -> PathBuf {
        self.output_dir.join(self.run_id.report_file_name(module_id))
    }
}

/// One unit of analysis logic.
pub trait AnalysisPlugin: Send + Sync {
    /// Stable module identifier; prefixes the report file name.
    fn id(&self) -> &str;

    /// Human-readable name for logs and report headers.
    fn name(&self) -> &str {
        self.id()
    }

    fn version(&self) -> &str {
        "0.1"
    }

    /// Canonical names of the hives that must be loaded before this plugin
    /// can run. Must be side-effect free.
    fn requirements(&self) -> Vec<String>;

    /// Run the analysis. `Ok(0)` is success; any other code, an `Err`, or a
    /// panic is recorded as a failure by the dispatcher.
    fn process(&self, ctx: &PluginContext<'_>) -> anyhow::Result<i32>;
}
