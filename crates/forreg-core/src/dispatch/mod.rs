/// Execution dispatcher: runs each compatible plugin and records what
/// happened.
///
/// Every invocation gets its own named worker thread. The dispatcher waits
/// for the result on a bounded channel, so a panic, an error return, a
/// nonzero status or an overrun of the timeout all end up as a `Failed`
/// outcome for that plugin alone. The remaining plugins always run.
///
/// In parallel mode every worker is started before any result is awaited,
/// and results are collected in resolver order. No pool thread is ever
/// parked on a plugin, so plugins are free to use rayon themselves.
///
/// A timed-out worker cannot be killed; it is detached and left to finish
/// in the background while the run moves on.
pub mod outcome;

pub use outcome::{DispatchOutcome, PluginState, RunSummary};

use crate::artifact::ArtifactSet;
use crate::config::DispatchConfig;
use crate::plugin::{PluginCatalog, PluginContext, PluginDescriptor, STATUS_OK};
use crate::resolver::Resolution;
use crate::run_id::RunId;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How a single invocation ended, as seen from the dispatching thread.
enum Invocation {
    Returned(i32),
    Errored(anyhow::Error),
    Panicked(String),
    TimedOut(Duration),
    /// The worker went away without reporting (could not be spawned, or
    /// dropped its sender).
    Lost(String),
}

/// Everything a worker thread needs, owned so it can outlive the caller.
#[derive(Clone)]
struct Shared {
    artifacts: Arc<ArtifactSet>,
    output_dir: PathBuf,
    run_id: RunId,
}

/// A started worker whose result has not been collected yet.
struct Worker {
    started: Instant,
    rx: Receiver<Invocation>,
    handle: JoinHandle<()>,
}

/// A plugin after launch: either running, or already settled without a
/// worker (unknown id, spawn failure).
enum Launch {
    Running(Worker),
    Settled(Invocation, Duration),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionDispatcher {
    config: DispatchConfig,
}

impl ExecutionDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Invoke every plugin in `resolution.compatible`, in order, against the
    /// shared artifacts. Incompatible plugins are carried into the summary
    /// untouched.
    pub fn run(
        &self,
        artifacts: &Arc<ArtifactSet>,
        resolution: &Resolution,
        catalog: &PluginCatalog,
        output_dir: &Path,
        run_id: &RunId,
    ) -> RunSummary {
        let shared = Shared {
            artifacts: Arc::clone(artifacts),
            output_dir: output_dir.to_path_buf(),
            run_id: run_id.clone(),
        };

        let outcomes: Vec<DispatchOutcome> = if self.config.parallel {
            let launched: Vec<(&str, Launch)> = resolution
                .compatible
                .iter()
                .map(|id| (id.as_str(), self.launch(id, catalog, &shared)))
                .collect();
            launched
                .into_iter()
                .map(|(id, launch)| self.settle(id, launch))
                .collect()
        } else {
            resolution
                .compatible
                .iter()
                .map(|id| self.settle(id, self.launch(id, catalog, &shared)))
                .collect()
        };

        RunSummary {
            run_id: run_id.clone(),
            outcomes,
            incompatible: resolution.incompatible.clone(),
        }
    }

    /// Start `id` on its own worker thread without waiting for it.
    fn launch(&self, id: &str, catalog: &PluginCatalog, shared: &Shared) -> Launch {
        let Some(descriptor) = catalog.get(id) else {
            error!("{id}: not found in plugin catalog");
            return Launch::Settled(Invocation::Lost("not found in catalog".into()), Duration::ZERO);
        };
        debug!("Running {} v{}", descriptor.name(), descriptor.version());

        let started = Instant::now();
        match spawn_worker(descriptor, shared) {
            Ok((rx, handle)) => Launch::Running(Worker { started, rx, handle }),
            Err(e) => Launch::Settled(
                Invocation::Lost(format!("could not start worker thread: {e}")),
                started.elapsed(),
            ),
        }
    }

    /// Wait for a launched plugin and turn its result into an outcome.
    fn settle(&self, id: &str, launch: Launch) -> DispatchOutcome {
        let (invocation, elapsed) = match launch {
            Launch::Settled(invocation, elapsed) => (invocation, elapsed),
            Launch::Running(worker) => self.wait(id, worker),
        };

        let outcome = match invocation {
            Invocation::Returned(STATUS_OK) => DispatchOutcome::succeeded(id, elapsed),
            Invocation::Returned(code) => {
                DispatchOutcome::failed(id, Some(code), format!("returned status {code}"), elapsed)
            }
            Invocation::Errored(e) => DispatchOutcome::failed(id, None, format!("{e:#}"), elapsed),
            Invocation::Panicked(msg) => {
                DispatchOutcome::failed(id, None, format!("panicked: {msg}"), elapsed)
            }
            Invocation::TimedOut(limit) => DispatchOutcome::failed(
                id,
                None,
                format!("timed out after {}s", limit.as_secs_f64()),
                elapsed,
            ),
            Invocation::Lost(why) => DispatchOutcome::failed(id, None, why, elapsed),
        };

        if outcome.is_success() {
            info!("{id} - completed successfully.");
        } else {
            warn!(
                "{id} - failed to complete. ({})",
                outcome.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
        outcome
    }

    /// The timeout runs from the worker's own start, not from when the
    /// dispatcher got round to waiting on it.
    fn wait(&self, id: &str, worker: Worker) -> (Invocation, Duration) {
        let Worker { started, rx, handle } = worker;
        let received = match self.config.plugin_timeout {
            Some(limit) => rx.recv_deadline(started + limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => Invocation::TimedOut(limit),
                RecvTimeoutError::Disconnected => {
                    Invocation::Lost("worker exited without reporting".into())
                }
            }),
            None => rx
                .recv()
                .map_err(|_| Invocation::Lost("worker exited without reporting".into())),
        };
        let elapsed = started.elapsed();

        let invocation = match received {
            Ok(invocation) => {
                // The worker has sent its result and is about to exit.
                let _ = handle.join();
                invocation
            }
            Err(Invocation::TimedOut(limit)) => {
                error!("{id}: no result after {}s; abandoning worker thread", limit.as_secs_f64());
                drop(handle);
                Invocation::TimedOut(limit)
            }
            Err(other) => other,
        };
        (invocation, elapsed)
    }
}

/// Spawn the named worker thread for one plugin. The worker inherits the
/// caller's tracing dispatcher and span.
fn spawn_worker(
    descriptor: &PluginDescriptor,
    shared: &Shared,
) -> std::io::Result<(Receiver<Invocation>, JoinHandle<()>)> {
    let (tx, rx) = crossbeam_channel::bounded::<Invocation>(1);
    let shared = shared.clone();
    let plugin = descriptor.plugin();
    let name = descriptor.name().to_string();
    let version = descriptor.version().to_string();
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let span = tracing::Span::current();

    let handle = thread::Builder::new()
        .name(format!("forreg-plugin-{}", descriptor.id()))
        .spawn(move || {
            let _guard = tracing::dispatcher::set_default(&dispatch);
            let _entered = span.enter();
            let ctx = PluginContext::new(&shared.artifacts, &shared.output_dir, &shared.run_id)
                .with_identity(&name, &version);
            let result = panic::catch_unwind(AssertUnwindSafe(|| plugin.process(&ctx)));
            let invocation = match result {
                Ok(Ok(code)) => Invocation::Returned(code),
                Ok(Err(e)) => Invocation::Errored(e),
                Err(payload) => Invocation::Panicked(panic_message(payload.as_ref())),
            };
            // The dispatcher may have given up waiting already.
            let _ = tx.send(invocation);
        })?;
    Ok((rx, handle))
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
