//! Compiled-in catalog of module factories keyed by entry point.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::HostContext;
use crate::manager::{ModuleInfo, ModuleManager};

/// Builds a module's manager from the host context and its descriptor info.
pub trait ModuleFactory: Send + Sync {
    fn create(
        &self,
        context: &Arc<HostContext>,
        info: &ModuleInfo,
    ) -> anyhow::Result<Arc<dyn ModuleManager>>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&Arc<HostContext>, &ModuleInfo) -> anyhow::Result<Arc<dyn ModuleManager>>
        + Send
        + Sync,
{
    fn create(
        &self,
        context: &Arc<HostContext>,
        info: &ModuleInfo,
    ) -> anyhow::Result<Arc<dyn ModuleManager>> {
        self(context, info)
    }
}

/// Factories by key. Keys are case-insensitive.
///
/// Local modules are looked up by the `factory` named in their manifest
/// (defaulting to the module name), qualified `pkg:path` modules by
/// `pkg/path`.
#[derive(Clone, Default)]
pub struct FactoryCatalog {
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure factory under `key`, replacing any previous one.
    pub fn register<F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        F: Fn(&Arc<HostContext>, &ModuleInfo) -> anyhow::Result<Arc<dyn ModuleManager>>
            + Send
            + Sync
            + 'static,
    {
        self.register_factory(key, Arc::new(factory))
    }

    pub fn register_factory(&mut self, key: &str, factory: Arc<dyn ModuleFactory>) -> &mut Self {
        self.factories.insert(key.to_lowercase(), factory);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories.get(&key.to_lowercase()).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryCatalog")
            .field("keys", &self.keys())
            .finish()
    }
}
