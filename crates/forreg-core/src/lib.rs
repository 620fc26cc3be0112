/// ForReg Core: hive loading, plugin compatibility, and dispatch.
///
/// This crate holds all of the analysis engine with no CLI or logging-sink
/// dependencies. A run is four steps over immutable data:
///
/// 1. [`artifact::ArtifactLoader`] turns an input directory into an
///    [`artifact::ArtifactSet`] with one record per expected hive.
/// 2. [`plugin::PluginCatalog::discover`] reads plugin manifests.
/// 3. [`resolver::resolve`] partitions the catalog into compatible and
///    incompatible plugins.
/// 4. [`dispatch::ExecutionDispatcher`] runs the compatible ones in
///    isolation and returns a [`dispatch::RunSummary`].
///
/// # Modules
///
/// - [`hive`]: read-only parser for `regf` registry hive files.
/// - [`artifact`]: hive catalog, loader, and the artifact set.
/// - [`plugin`]: plugin contract, built-in plugins, registry, discovery.
/// - [`resolver`]: requirement checking.
/// - [`dispatch`]: isolated plugin execution and outcomes.
/// - [`config`]: loader and dispatcher options.
/// - [`run_id`]: the per-run identifier shared by every output file.
pub mod artifact;
pub mod config;
pub mod dispatch;
pub mod hive;
pub mod plugin;
pub mod resolver;
pub mod run_id;

pub use artifact::{ArtifactLoader, ArtifactSet, ArtifactStatus, HIVE_CATALOG};
pub use config::{DispatchConfig, LoaderConfig, MatchPolicy, RunConfig};
pub use dispatch::{DispatchOutcome, ExecutionDispatcher, RunSummary};
pub use plugin::{AnalysisPlugin, PluginCatalog, PluginContext, PluginRegistry};
pub use resolver::{resolve, Resolution};
pub use run_id::RunId;
