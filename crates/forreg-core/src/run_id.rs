/// Run identifier: the start-time stamp shared by every file a run writes.
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `YYYY-MM-DD_HH-MM-SS`: sortable and safe in file names on every platform.
pub const RUN_ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Identifier for a run that started at `started`.
    pub fn from_start_time<Tz: TimeZone>(started: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(started.format(RUN_ID_FORMAT).to_string())
    }

    /// Identifier for a run starting now, in local time.
    pub fn now() -> Self {
        Self::from_start_time(&Local::now())
    }

    /// Wrap an arbitrary identifier (embedding, tests).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<module_id>_<run_id>.txt`
    pub fn report_file_name(&self, module_id: &str) -> String {
        format!("{module_id}_{}.txt", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn start_time_is_formatted_without_colons_or_spaces() {
        let t = Utc.with_ymd_and_hms(2013, 7, 25, 14, 3, 22).unwrap();
        let id = RunId::from_start_time(&t);
        assert_eq!(id.as_str(), "2013-07-25_14-03-22");
        assert!(!id.as_str().contains(':'));
    }

    #[test]
    fn report_name_combines_module_and_run() {
        let id = RunId::new("2013-07-25_14-03-22");
        assert_eq!(id.report_file_name("OS_Info"), "OS_Info_2013-07-25_14-03-22.txt");
    }
}
