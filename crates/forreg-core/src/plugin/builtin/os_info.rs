/// Operating-system information reporter.
///
/// Reads product/version details from SOFTWARE and processor plus
/// time-zone settings from the current control set in SYSTEM.
use super::report::Report;
use crate::hive::{Hive, HiveError, Key};
use crate::plugin::{AnalysisPlugin, PluginContext, STATUS_OK};
use anyhow::Context;
use chrono::DateTime;
use tracing::{debug, error};

const CURRENT_VERSION_KEY: &str = "Microsoft\\Windows NT\\CurrentVersion";

/// Value name → report label, in report order.
const PRODUCT_FIELDS: &[(&str, &str)] = &[
    ("ProductName", "Product Name"),
    ("CSDVersion", "Service Pack"),
    ("ProductId", "Product ID"),
    ("CurrentVersion", "Current Version"),
    ("CurrentBuild", "Current Build"),
    ("EditionID", "Edition"),
    ("PathName", "Install Path"),
    ("RegisteredOrganization", "Registered Organization"),
    ("RegisteredOwner", "Registered Owner"),
];

const PROCESSOR_FIELDS: &[(&str, &str)] = &[
    ("PROCESSOR_ARCHITECTURE", "Processor Architecture"),
    ("PROCESSOR_IDENTIFIER", "Processor ID"),
];

const TIMEZONE_FIELDS: &[(&str, &str)] = &[
    ("TimeZoneKeyName", "Time Zone Name"),
    ("StandardName", "Standard Timezone Name"),
    ("DaylightName", "Daylight Timezone Name"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct OsInfo;

impl AnalysisPlugin for OsInfo {
    fn id(&self) -> &str {
        "OS_Info"
    }

    fn name(&self) -> &str {
        "Operating System Info Reporter"
    }

    fn version(&self) -> &str {
        "0.1a"
    }

    fn requirements(&self) -> Vec<String> {
        vec!["SOFTWARE".into(), "SYSTEM".into()]
    }

    fn process(&self, ctx: &PluginContext<'_>) -> anyhow::Result<i32> {
        let software = ctx
            .artifacts
            .hive("SOFTWARE")
            .context("SOFTWARE hive is not loaded")?;
        let system = ctx
            .artifacts
            .hive("SYSTEM")
            .context("SYSTEM hive is not loaded")?;

        let (name, version) = ctx.identity(self);
        let mut report = match Report::create(ctx, self.id(), name, version) {
            Ok(r) => r,
            Err(e) => {
                error!("{name}: Failed to create report file - check output folder ({e}). Plugin aborting...");
                return Ok(1);
            }
        };
        let control_set = current_control_set(system);
        debug!("OS_Info: using {control_set}");

        // Installed OS details.
        report.section("Installed OS Info")?;
        let current_version = match software.open_key(CURRENT_VERSION_KEY) {
            Ok(k) => k,
            Err(e) => {
                error!("Key not found - check Windows version? ({e})");
                report.finish()?;
                return Ok(1);
            }
        };
        write_fields(&mut report, &current_version, PRODUCT_FIELDS)?;
        if let Ok(v) = current_version.value("InstallDate") {
            if let Some(formatted) = v
                .as_u32()
                .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
            {
                report.field(
                    "Install Date",
                    format!("{} (UTC)", formatted.format("%Y-%m-%d %H:%M:%S")),
                )?;
            }
        }

        let environment = format!("{control_set}\\Control\\Session Manager\\Environment");
        match system.open_key(&environment) {
            Ok(key) => write_fields(&mut report, &key, PROCESSOR_FIELDS)?,
            Err(e) => error!("Key not found: {environment} ({e})"),
        }

        // Clock settings.
        report.blank()?;
        report.section("System Clock Settings")?;
        let tz_path = format!("{control_set}\\Control\\TimeZoneInformation");
        let tz = match system.open_key(&tz_path) {
            Ok(k) => k,
            Err(e) => {
                error!("Key not found - check Windows version? ({e})");
                report.finish()?;
                return Ok(1);
            }
        };
        write_fields(&mut report, &tz, TIMEZONE_FIELDS)?;
        if let Some(raw) = tz.value("Bias").ok().and_then(|v| v.as_u32()) {
            // Stored as a DWORD but holds signed minutes from UTC.
            let bias = raw as i32;
            report.field(
                "Time Bias",
                format!("{bias} minutes ({} hours)", f64::from(bias) / 60.0),
            )?;
        }

        debug!("OS_Info: report written to {}", report.path().display());
        report.finish()?;
        Ok(STATUS_OK)
    }
}

/// `ControlSetNNN` named by `SYSTEM\Select\Current`, defaulting to 001.
fn current_control_set(system: &Hive) -> String {
    let current = system
        .open_key("Select")
        .and_then(|k| k.value("Current"))
        .and_then(|v| {
            v.as_u32()
                .ok_or_else(|| HiveError::Structure("Select\\Current is not a DWORD".into()))
        });
    match current {
        Ok(n) => format!("ControlSet{n:03}"),
        Err(e) => {
            error!("SYSTEM HIVE: Select Key not found ({e}).");
            "ControlSet001".to_string()
        }
    }
}

fn write_fields(report: &mut Report, key: &Key<'_>, fields: &[(&str, &str)]) -> anyhow::Result<()> {
    let values = key
        .values()
        .with_context(|| format!("reading values of {}", key.name()))?;
    for (value_name, label) in fields {
        if let Some(v) = values.iter().find(|v| v.name.eq_ignore_ascii_case(value_name)) {
            report.field(label, v.display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::testing::HiveBuilder;

    #[test]
    fn control_set_follows_select_current() {
        let hive = Hive::from_bytes(HiveBuilder::new("SYSTEM").dword_value("Select", "Current", 2).build())
            .unwrap();
        assert_eq!(current_control_set(&hive), "ControlSet002");
    }

    #[test]
    fn control_set_defaults_when_select_missing() {
        let hive = Hive::from_bytes(HiveBuilder::new("SYSTEM").build()).unwrap();
        assert_eq!(current_control_set(&hive), "ControlSet001");
    }
}
