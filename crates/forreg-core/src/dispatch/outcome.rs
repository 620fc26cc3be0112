/// Per-plugin outcomes and the run summary built from them.
use crate::run_id::RunId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Succeeded,
    /// Invoked and returned nonzero, returned an error, panicked, or
    /// exceeded the timeout.
    Failed,
}

/// What happened to one plugin in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub plugin_id: String,
    pub compatible: bool,
    pub state: PluginState,
    /// The code `process` returned, if it returned at all.
    pub status_code: Option<i32>,
    pub failure_reason: Option<String>,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

impl DispatchOutcome {
    pub(crate) fn succeeded(plugin_id: &str, elapsed: Duration) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            compatible: true,
            state: PluginState::Succeeded,
            status_code: Some(crate::plugin::STATUS_OK),
            failure_reason: None,
            elapsed,
        }
    }

    pub(crate) fn failed(
        plugin_id: &str,
        status_code: Option<i32>,
        reason: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            compatible: true,
            state: PluginState::Failed,
            status_code,
            failure_reason: Some(reason.into()),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == PluginState::Succeeded
    }
}

/// Outcomes for a whole run. Incompatible plugins were never invoked and
/// only appear by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    /// One per compatible plugin, in resolver order.
    pub outcomes: Vec<DispatchOutcome>,
    /// Discovery order.
    pub incompatible: Vec<String>,
}

impl RunSummary {
    pub fn incompatible_count(&self) -> usize {
        self.incompatible.len()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn get(&self, plugin_id: &str) -> Option<&DispatchOutcome> {
        self.outcomes.iter().find(|o| o.plugin_id == plugin_id)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_partitions_outcomes() {
        let summary = RunSummary {
            run_id: RunId::new("r"),
            outcomes: vec![
                DispatchOutcome::succeeded("a", Duration::from_millis(3)),
                DispatchOutcome::failed("b", Some(2), "returned status 2", Duration::ZERO),
            ],
            incompatible: vec!["c".to_string()],
        };
        assert_eq!(summary.succeeded().count(), 1);
        assert_eq!(summary.failed().next().unwrap().plugin_id, "b");
        assert_eq!(summary.incompatible_count(), 1);
        assert!(summary.get("c").is_none());
    }

    #[test]
    fn elapsed_serialises_as_milliseconds() {
        let o = DispatchOutcome::succeeded("a", Duration::from_millis(1500));
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["elapsed"], 1500);
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["status_code"], 0);
    }
}
