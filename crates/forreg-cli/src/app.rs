/// One complete ForReg run: startup checks, hive loading, plugin discovery,
/// resolution, dispatch, and the summary export.
use crate::args::Args;
use crate::logging;
use crate::report::{self, SummaryDocument};
use crate::startup::{self, StartupError};
use chrono::Local;
use forreg_core::artifact::{ArtifactLoader, ArtifactSet, HIVE_CATALOG};
use forreg_core::config::RunConfig;
use forreg_core::dispatch::{ExecutionDispatcher, RunSummary};
use forreg_core::plugin::{PluginCatalog, PluginRegistry};
use forreg_core::resolver::{self, Resolution};
use forreg_core::run_id::RunId;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span};

/// What a finished run leaves behind.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub log_path: PathBuf,
    /// `None` if the summary could not be written (logged, not fatal).
    pub summary_path: Option<PathBuf>,
    pub artifacts: Arc<ArtifactSet>,
    pub resolution: Resolution,
    pub summary: RunSummary,
}

/// Parse-free entry point: run with already-parsed arguments and the
/// built-in plugin registry.
pub fn run(args: &Args) -> Result<RunReport, StartupError> {
    run_with_registry(args, &PluginRegistry::with_builtins())
}

/// Run with a caller-supplied registry (extra or replacement plugins).
pub fn run_with_registry(args: &Args, registry: &PluginRegistry) -> Result<RunReport, StartupError> {
    let started_at = Local::now();
    let started = Instant::now();
    let run_id = RunId::from_start_time(&started_at);

    println!();
    let config = args.run_config(startup::default_plugin_dir);
    startup::prepare_directories(&config)?;
    let log = logging::install(&config.output_dir, &run_id, args.verbose)?;

    let span = info_span!("run", run_id = %run_id);
    let _entered = span.enter();
    report::print_banner();
    debug!("Run configuration: {config:?}");

    let (artifacts, resolution, summary, catalog_len) = execute(&config, registry, &run_id)?;

    let summary_path = match SummaryDocument::new(&config, &artifacts, &resolution, &summary)
        .write(&config.output_dir)
    {
        Ok(path) => {
            debug!("Run summary written to {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Could not write run summary: {e:#}");
            None
        }
    };
    debug!(
        "{} plugins discovered; {} succeeded, {} failed, {} not run",
        catalog_len,
        summary.succeeded().count(),
        summary.failed().count(),
        summary.incompatible_count()
    );

    println!();
    info!("ForReg took {:.3?} to run.", started.elapsed());

    Ok(RunReport {
        run_id,
        log_path: log.path().to_path_buf(),
        summary_path,
        artifacts,
        resolution,
        summary,
    })
}

/// Load → discover → resolve → dispatch, logging each stage.
fn execute(
    config: &RunConfig,
    registry: &PluginRegistry,
    run_id: &RunId,
) -> Result<(Arc<ArtifactSet>, Resolution, RunSummary, usize), StartupError> {
    report::print_heading("[CONFIGURATION]");
    report::log_configuration(config);

    report::print_heading("<ENUMERATING REGISTRY HIVES...>");
    let artifacts = ArtifactLoader::new(config.loader.clone()).load(&config.input_dir, &HIVE_CATALOG)?;
    let artifacts = Arc::new(artifacts);
    report::print_heading("[LOADED REGISTRY HIVES]");
    report::log_artifacts(&artifacts);
    let counts = artifacts.counts();
    debug!(
        "{} hives loaded, {} missing, {} failed",
        counts.loaded, counts.missing, counts.failed
    );

    report::print_heading("<ENUMERATING PLUGINS...>");
    let catalog = PluginCatalog::discover(&config.plugin_dir, registry)?;
    let resolution = resolver::resolve(&artifacts, &catalog);
    report::log_resolution(catalog.len(), &resolution);

    report::print_heading("<EXECUTING COMPATIBLE PLUGINS...>");
    let summary = ExecutionDispatcher::new(config.dispatch.clone()).run(
        &artifacts,
        &resolution,
        &catalog,
        &config.output_dir,
        run_id,
    );

    Ok((artifacts, resolution, summary, catalog.len()))
}
