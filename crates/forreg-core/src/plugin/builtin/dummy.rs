/// Dummy plugin: a template that exercises the plugin contract and writes
/// an empty report.
use super::report::Report;
use crate::plugin::{AnalysisPlugin, PluginContext, STATUS_OK};
use tracing::error;

#[derive(Debug, Default, Clone, Copy)]
pub struct Dummy;

impl AnalysisPlugin for Dummy {
    fn id(&self) -> &str {
        "Dummy"
    }

    fn name(&self) -> &str {
        "Dummy Plugin"
    }

    fn version(&self) -> &str {
        "0.1a"
    }

    fn requirements(&self) -> Vec<String> {
        vec!["SYSTEM".into(), "SOFTWARE".into()]
    }

    fn process(&self, ctx: &PluginContext<'_>) -> anyhow::Result<i32> {
        let (name, version) = ctx.identity(self);
        match Report::create(ctx, self.id(), name, version) {
            Ok(report) => {
                report.finish()?;
                Ok(STATUS_OK)
            }
            Err(e) => {
                error!("{name}: Failed to create report file - check output folder ({e}). Plugin aborting...");
                Ok(1)
            }
        }
    }
}
