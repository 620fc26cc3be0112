/// Per-run logging.
///
/// Two `fmt` layers share one subscriber:
///
/// - **file**: `<output>/ForReg_<run_id>.log`, everything from DEBUG up,
///   each line stamped `HH:MM:SS LEVEL`.
/// - **console**: stdout, INFO and up (DEBUG with `--verbose`), message
///   text only so the run reads like a report.
///
/// The subscriber is installed as the thread default for the lifetime of
/// the returned guard rather than globally, so several runs in one process
/// (tests, embedding) each get their own log file.
use crate::startup::StartupError;
use forreg_core::run_id::RunId;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const FILE_TIME_FORMAT: &str = "%H:%M:%S";

/// `ForReg_<run_id>.log`
pub fn log_file_name(run_id: &RunId) -> String {
    format!("ForReg_{run_id}.log")
}

/// Keeps the run's subscriber installed; dropping it restores the previous
/// default.
pub struct LogGuard {
    path: PathBuf,
    _default: DefaultGuard,
}

impl LogGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Console format: the event's fields and nothing else.
struct BareMessage;

impl<S, N> FormatEvent<S, N> for BareMessage
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Create the log file in `output_dir` and install the run's subscriber on
/// the current thread.
pub fn install(output_dir: &Path, run_id: &RunId, verbose: bool) -> Result<LogGuard, StartupError> {
    let path = output_dir.join(log_file_name(run_id));
    let file = File::create(&path).map_err(|source| StartupError::LogFile {
        path: path.clone(),
        source,
    })?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(FILE_TIME_FORMAT.to_string()))
        .with_filter(LevelFilter::DEBUG);

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .event_format(BareMessage)
        .with_filter(console_level);

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer);

    Ok(LogGuard {
        path,
        _default: tracing::subscriber::set_default(subscriber),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_receives_debug_events_with_timestamp_and_level() {
        let tmp = TempDir::new().unwrap();
        let run_id = RunId::new("2013-07-25_14-03-22");
        let guard = install(tmp.path(), &run_id, false).unwrap();
        tracing::debug!("only in the file");
        tracing::info!("Input Folder: somewhere");
        let path = guard.path().to_path_buf();
        drop(guard);

        assert_eq!(path, tmp.path().join("ForReg_2013-07-25_14-03-22.log"));
        let log = std::fs::read_to_string(path).unwrap();
        let debug_line = log.lines().find(|l| l.contains("only in the file")).unwrap();
        assert!(debug_line.contains("DEBUG"));
        // HH:MM:SS prefix.
        let stamp = &debug_line[..8];
        assert_eq!(stamp.matches(':').count(), 2);
        assert!(log.contains("Input Folder: somewhere"));
    }

    #[test]
    fn unwritable_output_dir_is_a_startup_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let err = install(&missing, &RunId::new("x"), false).err().unwrap();
        assert!(matches!(err, StartupError::LogFile { .. }));
    }
}
