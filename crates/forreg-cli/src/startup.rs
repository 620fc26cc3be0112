/// Startup checks: everything that must hold before any hive is opened.
///
/// Failures here end the process with a nonzero exit code. Nothing is
/// logged to file yet at this point (the log lives in the output folder),
/// so messages go straight to stderr.
use forreg_core::artifact::LoadError;
use forreg_core::config::RunConfig;
use forreg_core::plugin::CatalogError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the plugin folder looked up next to the executable.
pub const PLUGIN_DIR_NAME: &str = "plugins";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Input folder does not exist - exiting... ({})", .0.display())]
    InputMissing(PathBuf),
    #[error("Plugin folder does not exist - exiting... ({})", .0.display())]
    PluginDirMissing(PathBuf),
    #[error("Output folder {} could not be created: {source}", path.display())]
    OutputUncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot create log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Input(#[from] LoadError),
    #[error(transparent)]
    Plugins(#[from] CatalogError),
}

/// `<exe dir>/plugins` when it exists, otherwise `./plugins`.
pub fn default_plugin_dir() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(PLUGIN_DIR_NAME)));
    match beside_exe {
        Some(dir) if dir.is_dir() => dir,
        _ => PathBuf::from(PLUGIN_DIR_NAME),
    }
}

/// Validate the input and plugin folders, then make sure the output folder
/// exists. Nothing is created unless both inputs are usable.
pub fn prepare_directories(config: &RunConfig) -> Result<(), StartupError> {
    if !config.input_dir.is_dir() {
        return Err(StartupError::InputMissing(config.input_dir.clone()));
    }
    if !config.plugin_dir.is_dir() {
        return Err(StartupError::PluginDirMissing(config.plugin_dir.clone()));
    }
    ensure_output_dir(&config.output_dir)
}

fn ensure_output_dir(dir: &Path) -> Result<(), StartupError> {
    if dir.is_dir() {
        return Ok(());
    }
    eprintln!("WARNING: Output folder does not exist - creating folder...");
    std::fs::create_dir_all(dir).map_err(|source| StartupError::OutputUncreatable {
        path: dir.to_path_buf(),
        source,
    })
}
