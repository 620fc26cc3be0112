/// Plugin catalog: manifest-driven discovery of analysis plugins.
///
/// The plugin directory holds one `*.plugin.json` manifest per plugin,
/// either at the top level or one directory down (`plugins/os_info/...`).
/// Each manifest names a module key in the [`PluginRegistry`]; discovery
/// instantiates that module once and snapshots its id and requirements into
/// an immutable [`PluginDescriptor`].
///
/// Manifests are processed in path order so repeated runs report plugins
/// identically. A bad manifest only costs that one plugin: it is logged and
/// skipped.
use super::registry::PluginRegistry;
use super::AnalysisPlugin;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const MANIFEST_SUFFIX: &str = ".plugin.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read plugin directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
enum ManifestError {
    #[error("unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn enabled_by_default() -> bool {
    true
}

/// On-disk description of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Registry key of the implementation.
    pub module: String,
    /// Display name; defaults to the plugin's own.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// An immutable, discovered plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    id: String,
    name: String,
    version: String,
    requirements: BTreeSet<String>,
    manifest_path: Option<PathBuf>,
    plugin: Arc<dyn AnalysisPlugin>,
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("requirements", &self.requirements)
            .field("manifest_path", &self.manifest_path)
            .finish_non_exhaustive()
    }
}

impl PluginDescriptor {
    /// Snapshot a plugin's identity and requirements.
    pub fn new(plugin: Arc<dyn AnalysisPlugin>) -> Self {
        let requirements = plugin
            .requirements()
            .into_iter()
            .map(|r| r.to_ascii_uppercase())
            .collect();
        Self {
            id: plugin.id().to_string(),
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            requirements,
            manifest_path: None,
            plugin,
        }
    }

    fn from_manifest(plugin: Arc<dyn AnalysisPlugin>, manifest: PluginManifest, path: PathBuf) -> Self {
        let mut descriptor = Self::new(plugin);
        if let Some(name) = manifest.name {
            descriptor.name = name;
        }
        if let Some(version) = manifest.version {
            descriptor.version = version;
        }
        descriptor.manifest_path = Some(path);
        descriptor
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Upper-cased canonical hive names.
    pub fn requirements(&self) -> &BTreeSet<String> {
        &self.requirements
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// Shared handle to the implementation (the dispatcher moves it onto a
    /// worker thread).
    pub fn plugin(&self) -> Arc<dyn AnalysisPlugin> {
        Arc::clone(&self.plugin)
    }
}

/// Discovered plugins, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    descriptors: Vec<PluginDescriptor>,
}

impl PluginCatalog {
    /// Discover plugins from the manifests in `plugin_dir`.
    ///
    /// Only an unreadable `plugin_dir` is an error; problems with individual
    /// manifests are logged and the plugin is left out.
    pub fn discover(plugin_dir: &Path, registry: &PluginRegistry) -> Result<Self, CatalogError> {
        let manifests = find_manifests(plugin_dir)?;
        debug!(
            "Found {} plugin manifests under {}",
            manifests.len(),
            plugin_dir.display()
        );

        let mut descriptors: Vec<PluginDescriptor> = Vec::with_capacity(manifests.len());
        for path in manifests {
            let manifest = match read_manifest(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping plugin manifest {}: {e}", path.display());
                    continue;
                }
            };
            if !manifest.enabled {
                debug!("Plugin manifest {} is disabled", path.display());
                continue;
            }
            let Some(plugin) = registry.create(&manifest.module) else {
                warn!(
                    "Skipping plugin manifest {}: unknown module '{}'",
                    path.display(),
                    manifest.module
                );
                continue;
            };
            if descriptors.iter().any(|d| d.id == plugin.id()) {
                warn!(
                    "Skipping plugin manifest {}: plugin '{}' already discovered",
                    path.display(),
                    plugin.id()
                );
                continue;
            }
            descriptors.push(PluginDescriptor::from_manifest(plugin, manifest, path));
        }

        Ok(Self { descriptors })
    }

    /// Catalog of the given plugins, in order, skipping duplicate ids.
    pub fn from_plugins<I>(plugins: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn AnalysisPlugin>>,
    {
        let mut descriptors: Vec<PluginDescriptor> = Vec::new();
        for plugin in plugins {
            if descriptors.iter().any(|d| d.id == plugin.id()) {
                warn!("Ignoring duplicate plugin '{}'", plugin.id());
                continue;
            }
            descriptors.push(PluginDescriptor::new(plugin));
        }
        Self { descriptors }
    }

    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.descriptors.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn is_manifest(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(MANIFEST_SUFFIX))
            .unwrap_or(false)
}

/// Manifests in `dir` and its immediate sub-directories, sorted by path.
fn find_manifests(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| CatalogError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut found = Vec::new();
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.is_dir() {
            match std::fs::read_dir(&path) {
                Ok(sub) => found.extend(
                    sub.flatten()
                        .map(|e| e.path())
                        .filter(|p| is_manifest(p)),
                ),
                Err(e) => warn!("Skipping plugin sub-directory {}: {e}", path.display()),
            }
        } else if is_manifest(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn read_manifest(path: &Path) -> Result<PluginManifest, ManifestError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
