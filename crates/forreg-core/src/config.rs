/// Run configuration: the knobs shared by the loader and dispatcher.
///
/// Populated by the CLI from its flags; embedders can build it directly.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Plugin timeout used when the caller does not choose one.
pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// How the loader picks a file when several directory entries match the
/// same canonical hive name case-insensitively (e.g. `software` and
/// `SOFTWARE` on a case-sensitive filesystem).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// The last match in directory-listing order wins. Listing order is
    /// filesystem-dependent.
    #[default]
    LastListed,
    /// The listing is sorted by file name (byte order) first, so the
    /// alphabetically last match wins on every platform.
    Alphabetical,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub match_policy: MatchPolicy,
    /// Parse hives on a rayon pool instead of one at a time.
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Run compatible plugins concurrently. Outcomes are still reported in
    /// resolver order.
    pub parallel: bool,
    /// Upper bound on a single plugin invocation. `None` waits forever.
    pub plugin_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            plugin_timeout: Some(DEFAULT_PLUGIN_TIMEOUT),
        }
    }
}

/// Everything needed for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub plugin_dir: PathBuf,
    pub loader: LoaderConfig,
    pub dispatch: DispatchConfig,
}
