/// Run presentation: the banner, the section headers, the tables logged
/// between stages, and the JSON summary written at the end.
///
/// Section headers are printed straight to stdout; everything with content
/// goes through `tracing` so it also lands in the log file.
use forreg_core::artifact::{ArtifactSet, ArtifactStatus};
use forreg_core::config::RunConfig;
use forreg_core::dispatch::{DispatchOutcome, RunSummary};
use forreg_core::resolver::Resolution;
use forreg_core::run_id::RunId;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const BANNER: &str = r"    ______           ____
   / ____/___  _____/ __ \___  ____ _
  / /_  / __ \/ ___/ /_/ / _ \/ __ `/
 / __/ / /_/ / /  / _, _/  __/ /_/ /
/_/    \____/_/  /_/ |_|\___/\__, /
 Forensic Registry Analyser /____/";

const RULE: &str = "------------------------------------------------------";

pub fn print_banner() {
    println!("{BANNER}");
    println!("{RULE}");
    info!("Version [{}]", env!("CARGO_PKG_VERSION"));
    println!("{RULE}");
}

/// `[TITLE]` or `<TITLE...>` stage headers, preceded by a blank line.
pub fn print_heading(heading: &str) {
    println!("\n{heading}");
}

/// Absolute form of `path` for display; falls back to the path as given.
fn display_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn log_configuration(config: &RunConfig) {
    info!("Input Folder: {}", display_path(&config.input_dir).display());
    info!("Output Folder: {}", display_path(&config.output_dir).display());
    info!("Plugin Folder: {}", display_path(&config.plugin_dir).display());
}

/// One line per expected hive, in catalog order.
pub fn artifact_lines(artifacts: &ArtifactSet) -> Vec<String> {
    artifacts
        .iter()
        .map(|record| {
            let marker = record.status().marker();
            let name = record.canonical_name();
            match (record.status(), record.source_path()) {
                (ArtifactStatus::Loaded, Some(path)) => {
                    format!(" {marker} {name} -> Path: {}", path.display())
                }
                (ArtifactStatus::Missing, _) => format!(" {marker} {name} -] NOT FOUND"),
                _ => format!(" {marker} {name} -] FAILED TO LOAD"),
            }
        })
        .collect()
}

pub fn log_artifacts(artifacts: &ArtifactSet) {
    for line in artifact_lines(artifacts) {
        info!("{line}");
    }
}

pub fn resolution_lines(discovered: usize, resolution: &Resolution) -> Vec<String> {
    let mut lines = vec![format!("[PLUGINS IDENTIFIED: {discovered}]")];
    lines.push(format!(" [{}] Compatible Plugins:", resolution.compatible.len()));
    lines.extend(resolution.compatible.iter().map(|id| format!("  - {id}")));
    lines.push(format!(" [{}] Incompatible Plugins:", resolution.incompatible.len()));
    lines.extend(resolution.incompatible.iter().map(|id| format!("  - {id}")));
    lines
}

pub fn log_resolution(discovered: usize, resolution: &Resolution) {
    println!();
    for line in resolution_lines(discovered, resolution) {
        info!("{line}");
    }
}

/// `ForReg_<run_id>_summary.json`
pub fn summary_file_name(run_id: &RunId) -> String {
    format!("ForReg_{run_id}_summary.json")
}

#[derive(Debug, Serialize)]
struct ArtifactEntry<'a> {
    name: &'a str,
    status: ArtifactStatus,
    path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Machine-readable account of one run.
#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    run_id: &'a RunId,
    version: &'static str,
    input_dir: &'a Path,
    output_dir: &'a Path,
    plugin_dir: &'a Path,
    artifacts: Vec<ArtifactEntry<'a>>,
    compatible: &'a [String],
    incompatible: &'a [String],
    outcomes: &'a [DispatchOutcome],
}

impl<'a> SummaryDocument<'a> {
    pub fn new(
        config: &'a RunConfig,
        artifacts: &'a ArtifactSet,
        resolution: &'a Resolution,
        summary: &'a RunSummary,
    ) -> Self {
        Self {
            run_id: &summary.run_id,
            version: env!("CARGO_PKG_VERSION"),
            input_dir: &config.input_dir,
            output_dir: &config.output_dir,
            plugin_dir: &config.plugin_dir,
            artifacts: artifacts
                .iter()
                .map(|record| ArtifactEntry {
                    name: record.canonical_name(),
                    status: record.status(),
                    path: record.source_path(),
                    error: record.error().map(|e| e.to_string()),
                })
                .collect(),
            compatible: &resolution.compatible,
            incompatible: &resolution.incompatible,
            outcomes: &summary.outcomes,
        }
    }

    /// Pretty-print into `output_dir`, returning the file written.
    pub fn write(&self, output_dir: &Path) -> anyhow::Result<PathBuf> {
        use anyhow::Context;

        let path = output_dir.join(summary_file_name(self.run_id));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self)
            .with_context(|| format!("writing {}", path.display()))?;
        writeln!(out)?;
        out.flush()?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_lines_list_both_partitions() {
        let resolution = Resolution {
            compatible: vec!["OS_Info".into()],
            incompatible: vec!["Dummy".into(), "Other".into()],
        };
        assert_eq!(
            resolution_lines(3, &resolution),
            [
                "[PLUGINS IDENTIFIED: 3]",
                " [1] Compatible Plugins:",
                "  - OS_Info",
                " [2] Incompatible Plugins:",
                "  - Dummy",
                "  - Other",
            ]
        );
    }

    #[test]
    fn file_names_carry_the_run_id() {
        let id = RunId::new("2013-07-25_14-03-22");
        assert_eq!(summary_file_name(&id), "ForReg_2013-07-25_14-03-22_summary.json");
    }
}
