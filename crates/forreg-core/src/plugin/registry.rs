/// Plugin registry: maps manifest module keys to compiled-in factories.
use super::builtin::{Dummy, OsInfo};
use super::AnalysisPlugin;
use std::fmt;
use std::sync::Arc;

type Factory = Box<dyn Fn() -> Arc<dyn AnalysisPlugin> + Send + Sync>;

#[derive(Default)]
pub struct PluginRegistry {
    /// Keyed by lower-cased module name, in registration order.
    factories: Vec<(String, Factory)>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.modules()).finish()
    }
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every plugin shipped with ForReg.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("dummy", || Arc::new(Dummy))
            .register("os_info", || Arc::new(OsInfo));
        registry
    }

    /// Register (or replace) the factory for `module`.
    pub fn register<F>(&mut self, module: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn AnalysisPlugin> + Send + Sync + 'static,
    {
        let key = module.to_ascii_lowercase();
        self.factories.retain(|(k, _)| *k != key);
        self.factories.push((key, Box::new(factory)));
        self
    }

    /// Instantiate the plugin registered under `module` (case-insensitive).
    pub fn create(&self, module: &str) -> Option<Arc<dyn AnalysisPlugin>> {
        self.factories
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(module))
            .map(|(_, factory)| factory())
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(k, _)| k.as_str())
    }
}
