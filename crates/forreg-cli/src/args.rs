/// Command-line arguments.
use clap::{Parser, ValueEnum};
use forreg_core::config::{
    DispatchConfig, LoaderConfig, MatchPolicy, RunConfig, DEFAULT_PLUGIN_TIMEOUT,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "forreg")]
#[command(version)]
#[command(about = "ForReg - Forensic Registry Analyser")]
pub struct Args {
    /// Input folder path to the exported registry hives (e.g. SYSTEM, SOFTWARE, etc...)
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input: PathBuf,

    /// Output folder path for results and logs (created if absent)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: PathBuf,

    /// Path to the plugin folder (defaults to `plugins` next to the executable)
    #[arg(short = 'p', long = "plugindir", value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Load hives and run compatible plugins concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Seconds a single plugin may run before it is abandoned (0 = no limit)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_PLUGIN_TIMEOUT.as_secs())]
    pub plugin_timeout: u64,

    /// Which file wins when several match a hive name ignoring case
    #[arg(long, value_enum, default_value_t = MatchPolicyArg::LastListed)]
    pub match_policy: MatchPolicyArg,

    /// Show debug messages on the console
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchPolicyArg {
    LastListed,
    Alphabetical,
}

impl From<MatchPolicyArg> for MatchPolicy {
    fn from(arg: MatchPolicyArg) -> Self {
        match arg {
            MatchPolicyArg::LastListed => MatchPolicy::LastListed,
            MatchPolicyArg::Alphabetical => MatchPolicy::Alphabetical,
        }
    }
}

impl Args {
    /// Resolve the flags into a run configuration. `default_plugin_dir` is
    /// consulted only when `--plugindir` was not given.
    pub fn run_config(&self, default_plugin_dir: impl FnOnce() -> PathBuf) -> RunConfig {
        RunConfig {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            plugin_dir: self.plugin_dir.clone().unwrap_or_else(default_plugin_dir),
            loader: LoaderConfig {
                match_policy: self.match_policy.into(),
                parallel: self.parallel,
            },
            dispatch: DispatchConfig {
                parallel: self.parallel,
                plugin_timeout: match self.plugin_timeout {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                },
            },
        }
    }
}
