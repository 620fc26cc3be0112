/// Parallel dispatch with plugins that use rayon themselves.
///
/// Lives in its own test binary because it shrinks rayon's global pool to a
/// single thread, which must happen before anything else touches the pool.
use forreg_core::artifact::{ArtifactLoader, HIVE_CATALOG};
use forreg_core::config::{DispatchConfig, LoaderConfig};
use forreg_core::dispatch::{ExecutionDispatcher, PluginState, RunSummary};
use forreg_core::plugin::{AnalysisPlugin, PluginCatalog, PluginContext};
use forreg_core::resolver::resolve;
use forreg_core::run_id::RunId;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Sums a range on the global rayon pool and writes the total.
struct Summer(&'static str);

impl AnalysisPlugin for Summer {
    fn id(&self) -> &str {
        self.0
    }
    fn requirements(&self) -> Vec<String> {
        Vec::new()
    }
    fn process(&self, ctx: &PluginContext<'_>) -> anyhow::Result<i32> {
        let total: u64 = (0..1000_u64).into_par_iter().sum();
        std::fs::write(ctx.report_path(self.0), total.to_string())?;
        Ok(if total == 499_500 { 0 } else { 1 })
    }
}

fn dispatch(parallel: bool) -> RunSummary {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let artifacts = Arc::new(
        ArtifactLoader::new(LoaderConfig::default())
            .load(input.path(), &HIVE_CATALOG)
            .unwrap(),
    );
    let catalog = PluginCatalog::from_plugins([
        Arc::new(Summer("A")) as Arc<dyn AnalysisPlugin>,
        Arc::new(Summer("B")) as Arc<dyn AnalysisPlugin>,
    ]);
    let resolution = resolve(&artifacts, &catalog);
    let config = DispatchConfig {
        parallel,
        plugin_timeout: Some(Duration::from_secs(10)),
    };
    ExecutionDispatcher::new(config).run(
        &artifacts,
        &resolution,
        &catalog,
        output.path(),
        &RunId::new("2024-01-01_00-00-00"),
    )
}

#[test]
fn rayon_plugins_finish_under_parallel_dispatch() {
    // Ignore the error if the pool already exists; one thread is the worst case.
    let _ = rayon::ThreadPoolBuilder::new().num_threads(1).build_global();

    for parallel in [false, true] {
        let started = Instant::now();
        let summary = dispatch(parallel);
        assert!(started.elapsed() < Duration::from_secs(5), "parallel={parallel}");
        let states: Vec<_> = summary
            .outcomes
            .iter()
            .map(|o| (o.plugin_id.as_str(), o.state))
            .collect();
        assert_eq!(
            states,
            [("A", PluginState::Succeeded), ("B", PluginState::Succeeded)],
            "parallel={parallel}"
        );
    }
}
