/// Report file helper shared by the built-in plugins.
///
/// Creates `<output>/<id>_<run_id>.txt`, writes the `"<name> - v<version>"`
/// header and a rule, then hands out line-oriented writes.
use crate::plugin::PluginContext;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const RULE: &str = "--------------------------------------------------";

pub struct Report {
    path: PathBuf,
    out: BufWriter<File>,
}

impl Report {
    pub fn create(ctx: &PluginContext<'_>, id: &str, name: &str, version: &str) -> std::io::Result<Self> {
        let path = ctx.report_path(id);
        info!(
            " {name} -> {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "{name} - v{version}")?;
        writeln!(out, "{RULE}")?;
        Ok(Self { path, out })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn section(&mut self, title: &str) -> anyhow::Result<()> {
        writeln!(self.out, "[{title}]").with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn blank(&mut self) -> anyhow::Result<()> {
        writeln!(self.out).with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn field(&mut self, label: &str, value: impl std::fmt::Display) -> anyhow::Result<()> {
        writeln!(self.out, "{label}: {value}")
            .with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn finish(mut self) -> anyhow::Result<()> {
        self.out
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))
    }
}
