/// Artifact loader: turns an input directory into a complete [`ArtifactSet`].
///
/// For every expected name the directory listing is searched for an entry
/// whose file name equals the name ignoring ASCII case (never a substring
/// match). When several entries match, the [`MatchPolicy`] decides which
/// one is parsed; by default the last one in listing order.
///
/// A hive that is absent or unparsable is classified and logged; it never
/// aborts loading. The only error surfaced to the caller is an input
/// directory that cannot be listed at all.
use super::record::{ArtifactRecord, ArtifactSet};
use crate::config::{LoaderConfig, MatchPolicy};
use crate::hive::{HiveOpener, RegfOpener};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read input directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One entry of the input directory listing. Directories are kept: a
/// matching directory is chosen like any file and then fails to parse.
#[derive(Debug, Clone)]
struct ListedFile {
    name: String,
    path: PathBuf,
}

pub struct ArtifactLoader<O: HiveOpener = RegfOpener> {
    opener: O,
    config: LoaderConfig,
}

impl ArtifactLoader<RegfOpener> {
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_opener(RegfOpener, config)
    }
}

impl<O: HiveOpener> ArtifactLoader<O> {
    /// Use a custom parser at the loader boundary.
    pub fn with_opener(opener: O, config: LoaderConfig) -> Self {
        Self { opener, config }
    }

    /// Build a record for every name in `expected`, in that order.
    pub fn load(&self, input_dir: &Path, expected: &[&str]) -> Result<ArtifactSet, LoadError> {
        let listing = list_files(input_dir, self.config.match_policy)?;
        debug!(
            "Input directory {} holds {} candidate entries",
            input_dir.display(),
            listing.len()
        );

        let records = if self.config.parallel {
            self.classify_parallel(expected, &listing)
        } else {
            expected
                .iter()
                .map(|name| self.classify(name, &listing))
                .collect()
        };

        Ok(ArtifactSet::from_records(records))
    }

    fn classify_parallel(&self, expected: &[&str], listing: &[ListedFile]) -> Vec<ArtifactRecord> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get().min(expected.len()).max(1))
            .thread_name(|i| format!("forreg-loader-{i}"))
            .build();
        match pool {
            // `collect` on an indexed parallel iterator keeps catalog order.
            Ok(pool) => {
                // Pool threads do not inherit a thread-scoped subscriber.
                let dispatch = tracing::dispatcher::get_default(|d| d.clone());
                pool.install(|| {
                    expected
                        .par_iter()
                        .map(|name| {
                            tracing::dispatcher::with_default(&dispatch, || {
                                self.classify(name, listing)
                            })
                        })
                        .collect()
                })
            }
            Err(e) => {
                warn!("Could not start loader thread pool ({e}); loading sequentially");
                expected
                    .iter()
                    .map(|name| self.classify(name, listing))
                    .collect()
            }
        }
    }

    /// Locate and parse one expected hive.
    fn classify(&self, name: &str, listing: &[ListedFile]) -> ArtifactRecord {
        let mut matches = listing
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name));
        let Some(first) = matches.next() else {
            debug!("{name}: not found");
            return ArtifactRecord::missing(name);
        };
        let extra = matches.count();
        let chosen = listing
            .iter()
            .rev()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .unwrap_or(first);
        if extra > 0 {
            warn!(
                "{name}: {} files match case-insensitively; using {}",
                extra + 1,
                chosen.path.display()
            );
        }

        match self.opener.open(&chosen.path) {
            Ok(hive) => {
                debug!("{name}: loaded {} ({} bytes)", chosen.path.display(), hive.len());
                ArtifactRecord::loaded(name, chosen.path.clone(), hive)
            }
            Err(e) if e.is_structural() => {
                error!(
                    "Cannot parse registry file: {}. File may be corrupt ({e}).",
                    chosen.path.display()
                );
                ArtifactRecord::parse_failed(name, chosen.path.clone(), e)
            }
            Err(e) => {
                error!(
                    "Cannot parse registry file: {}. File may be corrupt - check the filesize is non-zero ({e}).",
                    chosen.path.display()
                );
                ArtifactRecord::parse_failed(name, chosen.path.clone(), e)
            }
        }
    }
}

/// List every entry directly inside `dir`.
fn list_files(dir: &Path, policy: MatchPolicy) -> Result<Vec<ListedFile>, LoadError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        files.push(ListedFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        });
    }

    if policy == MatchPolicy::Alphabetical {
        files.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(files)
}
