/// End-to-end tests for the load → discover → resolve → dispatch pipeline.
///
/// Hives are synthesised with `HiveBuilder` and written into a temporary
/// input directory; plugins are discovered from real manifest files. Nothing
/// is mocked below the `AnalysisPlugin` trait.
use forreg_core::artifact::{ArtifactLoader, ArtifactStatus, HIVE_CATALOG};
use forreg_core::config::{DispatchConfig, LoaderConfig};
use forreg_core::dispatch::{ExecutionDispatcher, PluginState, RunSummary};
use forreg_core::hive::testing::HiveBuilder;
use forreg_core::plugin::{AnalysisPlugin, PluginCatalog, PluginContext, PluginRegistry};
use forreg_core::resolver::resolve;
use forreg_core::run_id::RunId;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const RUN: &str = "2013-07-25_14-03-22";

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Plugin with fixed requirements that fails on demand.
struct Probe {
    id: &'static str,
    requires: &'static [&'static str],
    throws: bool,
}

impl AnalysisPlugin for Probe {
    fn id(&self) -> &str {
        self.id
    }
    fn requirements(&self) -> Vec<String> {
        self.requires.iter().map(|r| r.to_string()).collect()
    }
    fn process(&self, ctx: &PluginContext<'_>) -> anyhow::Result<i32> {
        fs::write(ctx.report_path(self.id), self.id)?;
        if self.throws {
            anyhow::bail!("{} could not find its key", self.id);
        }
        Ok(0)
    }
}

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::with_builtins();
    registry
        .register("needs_sys_soft", || {
            Arc::new(Probe {
                id: "SysSoft",
                requires: &["SYSTEM", "SOFTWARE"],
                throws: false,
            })
        })
        .register("needs_sys_sec", || {
            Arc::new(Probe {
                id: "SysSec",
                requires: &["SYSTEM", "SECURITY"],
                throws: false,
            })
        })
        .register("thrower", || {
            Arc::new(Probe {
                id: "Thrower",
                requires: &["SYSTEM"],
                throws: true,
            })
        });
    registry
}

fn write_manifest(plugin_dir: &Path, file: &str, module: &str) {
    fs::write(
        plugin_dir.join(file),
        format!(r#"{{ "module": "{module}", "author": "test" }}"#),
    )
    .unwrap();
}

fn software_hive() -> HiveBuilder {
    let cv = "Microsoft\\Windows NT\\CurrentVersion";
    HiveBuilder::new("CMI-CreateHive{SOFTWARE}")
        .embedded_name("SOFTWARE")
        .string_value(cv, "ProductName", "Windows 7 Professional")
        .string_value(cv, "CSDVersion", "Service Pack 1")
        .string_value(cv, "CurrentVersion", "6.1")
        .string_value(cv, "CurrentBuild", "7601")
        .string_value(cv, "RegisteredOwner", "Examiner")
        .dword_value(cv, "InstallDate", 1_000_000_000)
}

fn system_hive() -> HiveBuilder {
    HiveBuilder::new("CMI-CreateHive{SYSTEM}")
        .embedded_name("SYSTEM")
        .dword_value("Select", "Current", 1)
        .string_value(
            "ControlSet001\\Control\\Session Manager\\Environment",
            "PROCESSOR_ARCHITECTURE",
            "AMD64",
        )
        .string_value(
            "ControlSet001\\Control\\TimeZoneInformation",
            "StandardName",
            "GMT Standard Time",
        )
        .dword_value(
            "ControlSet001\\Control\\TimeZoneInformation",
            "Bias",
            (-60_i32) as u32,
        )
}

struct Run {
    _dirs: (TempDir, TempDir, TempDir),
    output: PathBuf,
    summary: RunSummary,
    artifacts: Arc<forreg_core::ArtifactSet>,
}

/// Run the whole pipeline over `input` with every manifest in `plugin_dir`.
fn run_pipeline(input: TempDir, plugin_dir: TempDir, dispatch: DispatchConfig) -> Run {
    let output = TempDir::new().unwrap();
    let artifacts = ArtifactLoader::new(LoaderConfig::default())
        .load(input.path(), &HIVE_CATALOG)
        .unwrap();
    let artifacts = Arc::new(artifacts);
    let catalog = PluginCatalog::discover(plugin_dir.path(), &registry()).unwrap();
    let resolution = resolve(&artifacts, &catalog);
    let summary = ExecutionDispatcher::new(dispatch).run(
        &artifacts,
        &resolution,
        &catalog,
        output.path(),
        &RunId::new(RUN),
    );
    Run {
        output: output.path().to_path_buf(),
        _dirs: (input, plugin_dir, output),
        summary,
        artifacts,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn only_plugins_with_all_hives_loaded_are_run() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();
    system_hive().write_to(&input.path().join("SYSTEM")).unwrap();

    let plugins = TempDir::new().unwrap();
    write_manifest(plugins.path(), "a.plugin.json", "needs_sys_soft");
    write_manifest(plugins.path(), "b.plugin.json", "needs_sys_sec");

    let run = run_pipeline(input, plugins, DispatchConfig::default());
    for name in ["SYSTEM", "SOFTWARE"] {
        assert_eq!(run.artifacts.status(name), Some(ArtifactStatus::Loaded), "{name}");
    }
    for name in ["SECURITY", "SAM", "NTUSER.DAT"] {
        assert_eq!(run.artifacts.status(name), Some(ArtifactStatus::Missing), "{name}");
    }

    let ran: Vec<_> = run.summary.outcomes.iter().map(|o| o.plugin_id.as_str()).collect();
    assert_eq!(ran, ["SysSoft"]);
    assert_eq!(run.summary.incompatible, ["SysSec"]);
    assert!(run.output.join(format!("SysSoft_{RUN}.txt")).exists());
    assert!(!run.output.join(format!("SysSec_{RUN}.txt")).exists());
}

#[test]
fn zero_byte_hive_is_parse_failed_and_blocks_dependants() {
    let input = TempDir::new().unwrap();
    system_hive().write_to(&input.path().join("SYSTEM")).unwrap();
    fs::write(input.path().join("SECURITY"), b"").unwrap();

    let plugins = TempDir::new().unwrap();
    write_manifest(plugins.path(), "sec.plugin.json", "needs_sys_sec");

    let run = run_pipeline(input, plugins, DispatchConfig::default());
    let security = run.artifacts.get("SECURITY").unwrap();
    assert_eq!(security.status(), ArtifactStatus::ParseFailed);
    assert!(security.handle().is_none());
    assert!(!security.error().unwrap().is_structural());
    assert_eq!(run.summary.incompatible, ["SysSec"]);
    assert!(run.summary.outcomes.is_empty());
}

#[test]
fn last_listed_duplicate_wins() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("software")).unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();

    let expected = fs::read_dir(input.path())
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .eq_ignore_ascii_case("software")
        })
        .last()
        .unwrap();

    let set = ArtifactLoader::new(LoaderConfig::default())
        .load(input.path(), &HIVE_CATALOG)
        .unwrap();
    assert_eq!(set.len(), HIVE_CATALOG.len());
    let software = set.get("SOFTWARE").unwrap();
    assert_eq!(software.status(), ArtifactStatus::Loaded);
    assert_eq!(software.source_path(), Some(expected.as_path()));
}

#[test]
fn throwing_plugin_does_not_stop_the_others() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();
    system_hive().write_to(&input.path().join("SYSTEM")).unwrap();

    let plugins = TempDir::new().unwrap();
    write_manifest(plugins.path(), "1.plugin.json", "thrower");
    write_manifest(plugins.path(), "2.plugin.json", "dummy");
    write_manifest(plugins.path(), "3.plugin.json", "needs_sys_soft");

    let run = run_pipeline(input, plugins, DispatchConfig::default());
    let states: Vec<_> = run
        .summary
        .outcomes
        .iter()
        .map(|o| (o.plugin_id.as_str(), o.state))
        .collect();
    assert_eq!(
        states,
        [
            ("Thrower", PluginState::Failed),
            ("Dummy", PluginState::Succeeded),
            ("SysSoft", PluginState::Succeeded),
        ]
    );
    let thrower = run.summary.get("Thrower").unwrap();
    assert_eq!(thrower.status_code, None);
    assert!(thrower
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("could not find its key"));
}

#[test]
fn parallel_dispatch_reports_in_discovery_order() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();
    system_hive().write_to(&input.path().join("SYSTEM")).unwrap();

    let plugins = TempDir::new().unwrap();
    fs::create_dir(plugins.path().join("nested")).unwrap();
    write_manifest(plugins.path(), "a.plugin.json", "needs_sys_soft");
    write_manifest(&plugins.path().join("nested"), "b.plugin.json", "dummy");
    write_manifest(plugins.path(), "c.plugin.json", "os_info");

    let config = DispatchConfig {
        parallel: true,
        ..DispatchConfig::default()
    };
    let run = run_pipeline(input, plugins, config);
    let ran: Vec<_> = run.summary.outcomes.iter().map(|o| o.plugin_id.as_str()).collect();
    assert_eq!(ran, ["SysSoft", "OS_Info", "Dummy"]);
    assert_eq!(run.summary.succeeded().count(), 3);
}

#[test]
fn os_info_report_contents() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();
    system_hive().write_to(&input.path().join("SYSTEM")).unwrap();

    let plugins = TempDir::new().unwrap();
    write_manifest(plugins.path(), "os_info.plugin.json", "os_info");

    let run = run_pipeline(input, plugins, DispatchConfig::default());
    let outcome = run.summary.get("OS_Info").unwrap();
    assert_eq!(outcome.state, PluginState::Succeeded);

    let report = fs::read_to_string(run.output.join(format!("OS_Info_{RUN}.txt"))).unwrap();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(lines[0], "Operating System Info Reporter - v0.1a");
    assert!(lines[1].chars().all(|c| c == '-'));
    assert!(report.contains("[Installed OS Info]"));
    assert!(report.contains("Product Name: Windows 7 Professional"));
    assert!(report.contains("Service Pack: Service Pack 1"));
    assert!(report.contains("Registered Owner: Examiner"));
    assert!(report.contains("Install Date: 2001-09-09 01:46:40 (UTC)"));
    assert!(report.contains("Processor Architecture: AMD64"));
    assert!(report.contains("[System Clock Settings]"));
    assert!(report.contains("Standard Timezone Name: GMT Standard Time"));
    assert!(report.contains("Time Bias: -60 minutes (-1 hours)"));
}

#[test]
fn manifest_name_and_version_head_the_report() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();
    system_hive().write_to(&input.path().join("SYSTEM")).unwrap();

    let plugins = TempDir::new().unwrap();
    fs::write(
        plugins.path().join("dummy.plugin.json"),
        r#"{ "module": "dummy", "name": "Template Plugin", "version": "2.0" }"#,
    )
    .unwrap();

    let run = run_pipeline(input, plugins, DispatchConfig::default());
    assert!(run.summary.get("Dummy").unwrap().is_success());
    let report = fs::read_to_string(run.output.join(format!("Dummy_{RUN}.txt"))).unwrap();
    assert_eq!(report.lines().next(), Some("Template Plugin - v2.0"));
}

#[test]
fn os_info_fails_without_time_zone_key() {
    let input = TempDir::new().unwrap();
    software_hive().write_to(&input.path().join("SOFTWARE")).unwrap();
    HiveBuilder::new("SYSTEM")
        .dword_value("Select", "Current", 1)
        .write_to(&input.path().join("SYSTEM"))
        .unwrap();

    let plugins = TempDir::new().unwrap();
    write_manifest(plugins.path(), "os_info.plugin.json", "os_info");

    let run = run_pipeline(input, plugins, DispatchConfig::default());
    let outcome = run.summary.get("OS_Info").unwrap();
    assert_eq!(outcome.state, PluginState::Failed);
    assert_eq!(outcome.status_code, Some(1));
    // The partial report is still written.
    assert!(run.output.join(format!("OS_Info_{RUN}.txt")).exists());
}
