/// ForReg CLI: argument parsing, startup checks, per-run logging, and the
/// console/JSON presentation around the `forreg-core` engine.
///
/// # Modules
///
/// - [`args`]: clap flags and their mapping onto `RunConfig`.
/// - [`startup`]: folder validation and fatal startup errors.
/// - [`logging`]: the file + console subscriber for one run.
/// - [`report`]: banner, stage tables, and the JSON run summary.
/// - [`app`]: the run itself.
pub mod app;
pub mod args;
pub mod logging;
pub mod report;
pub mod startup;

pub use app::{run, run_with_registry, RunReport};
pub use args::Args;
pub use startup::StartupError;

use clap::Parser;
use std::process::ExitCode;

/// Parse the process arguments and run. Exit code 1 on a fatal startup
/// error; 0 once the run completes, whatever the plugins reported.
pub fn main_entry() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
