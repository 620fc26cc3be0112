/// Artifact records: the typed outcome of locating and parsing one hive.
///
/// A record's state is fixed when the loader builds it. The private
/// [`RecordState`] enum makes the field invariants structural: only a
/// loaded record carries a hive handle, and only records for which a file
/// was found carry a source path.
use crate::hive::{Hive, HiveError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The hives ForReg looks for, in the order they are loaded and reported.
pub const HIVE_CATALOG: [&str; 5] = ["SYSTEM", "SOFTWARE", "SECURITY", "SAM", "NTUSER.DAT"];

/// Classification of one expected hive. Terminal once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// No directory entry matched the canonical name.
    Missing,
    /// A file matched and parsed.
    Loaded,
    /// A file matched but could not be parsed.
    ParseFailed,
}

impl ArtifactStatus {
    /// Marker used in the loaded-hives table.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Loaded => "[Y]",
            Self::Missing => "[N]",
            Self::ParseFailed => "[!]",
        }
    }
}

#[derive(Debug)]
enum RecordState {
    Missing,
    Loaded { path: PathBuf, hive: Hive },
    ParseFailed { path: PathBuf, error: HiveError },
}

/// Result of looking for one canonical hive name.
#[derive(Debug)]
pub struct ArtifactRecord {
    canonical_name: String,
    state: RecordState,
}

impl ArtifactRecord {
    pub(crate) fn missing(name: &str) -> Self {
        Self {
            canonical_name: name.to_string(),
            state: RecordState::Missing,
        }
    }

    pub(crate) fn loaded(name: &str, path: PathBuf, hive: Hive) -> Self {
        Self {
            canonical_name: name.to_string(),
            state: RecordState::Loaded { path, hive },
        }
    }

    pub(crate) fn parse_failed(name: &str, path: PathBuf, error: HiveError) -> Self {
        Self {
            canonical_name: name.to_string(),
            state: RecordState::ParseFailed { path, error },
        }
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn status(&self) -> ArtifactStatus {
        match self.state {
            RecordState::Missing => ArtifactStatus::Missing,
            RecordState::Loaded { .. } => ArtifactStatus::Loaded,
            RecordState::ParseFailed { .. } => ArtifactStatus::ParseFailed,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, RecordState::Loaded { .. })
    }

    /// Path of the matched file, whether or not it parsed.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.state {
            RecordState::Missing => None,
            RecordState::Loaded { path, .. } | RecordState::ParseFailed { path, .. } => Some(path),
        }
    }

    /// The parsed hive. Present only for loaded records.
    pub fn handle(&self) -> Option<&Hive> {
        match &self.state {
            RecordState::Loaded { hive, .. } => Some(hive),
            _ => None,
        }
    }

    /// Why parsing failed. Present only for failed records.
    pub fn error(&self) -> Option<&HiveError> {
        match &self.state {
            RecordState::ParseFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Loaded / missing / failed tallies for a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactCounts {
    pub loaded: usize,
    pub missing: usize,
    pub failed: usize,
}

/// One record per expected hive, in catalog order.
///
/// Built only by the loader; downstream code gets shared read-only access.
#[derive(Debug)]
pub struct ArtifactSet {
    records: Vec<ArtifactRecord>,
}

impl ArtifactSet {
    pub(crate) fn from_records(records: Vec<ArtifactRecord>) -> Self {
        Self { records }
    }

    /// Case-insensitive lookup by canonical name.
    pub fn get(&self, name: &str) -> Option<&ArtifactRecord> {
        self.records
            .iter()
            .find(|r| r.canonical_name.eq_ignore_ascii_case(name))
    }

    pub fn status(&self, name: &str) -> Option<ArtifactStatus> {
        self.get(name).map(ArtifactRecord::status)
    }

    /// The parsed hive for `name`, if it loaded.
    pub fn hive(&self, name: &str) -> Option<&Hive> {
        self.get(name).and_then(ArtifactRecord::handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.records.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.canonical_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> ArtifactCounts {
        let mut counts = ArtifactCounts::default();
        for record in &self.records {
            match record.status() {
                ArtifactStatus::Loaded => counts.loaded += 1,
                ArtifactStatus::Missing => counts.missing += 1,
                ArtifactStatus::ParseFailed => counts.failed += 1,
            }
        }
        counts
    }
}
