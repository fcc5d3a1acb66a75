//! Shared test utilities: recording managers, counting catalogs and
//! throwaway application roots.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use modhost_core::Phase;
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::catalog::FactoryCatalog;
use crate::context::HostContext;
use crate::descriptor::{ModuleDescriptor, ModuleKind, Order, Registry};
use crate::manager::{Dependencies, DependencyManagers, ModuleManager};
use crate::resolver::ENTRY_POINT_FILE;

/// Lifecycle events and the dependency managers each module received.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    dependencies: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Sorted dependency names handed to `name`'s start call.
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<String>> {
        self.dependencies.lock().get(name).cloned()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

/// Configurable manager that records its lifecycle calls.
#[derive(Clone)]
pub struct TestManager {
    name: String,
    dependencies: Dependencies,
    recorder: Option<Recorder>,
    fail: Option<Phase>,
}

impl TestManager {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dependencies: Dependencies::None,
            recorder: None,
            fail: None,
        }
    }

    pub fn depends_on<const N: usize>(mut self, names: [&str; N]) -> Self {
        self.dependencies = Dependencies::modules(names);
        self
    }

    pub fn priority(mut self, value: i64) -> Self {
        self.dependencies = Dependencies::Priority(value);
        self
    }

    pub fn recording(mut self, recorder: &Recorder) -> Self {
        self.recorder = Some(recorder.clone());
        self
    }

    pub fn failing(mut self, phase: Phase) -> Self {
        self.fail = Some(phase);
        self
    }

    pub fn into_arc(self) -> Arc<dyn ModuleManager> {
        Arc::new(self)
    }

    fn record(&self, event: &str) {
        if let Some(recorder) = &self.recorder {
            recorder.push(format!("{}:{}", event, self.name));
        }
    }
}

impl From<TestManager> for Arc<dyn ModuleManager> {
    fn from(manager: TestManager) -> Self {
        manager.into_arc()
    }
}

#[async_trait]
impl ModuleManager for TestManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Dependencies {
        self.dependencies.clone()
    }

    async fn start(
        &self,
        dependencies: &DependencyManagers,
        _registry: &Registry,
        _order: &Order,
    ) -> anyhow::Result<()> {
        self.record("start");
        if let Some(recorder) = &self.recorder {
            let mut names: Vec<String> = dependencies.keys().cloned().collect();
            names.sort();
            recorder.dependencies.lock().insert(self.name.clone(), names);
        }
        if self.fail == Some(Phase::Start) {
            anyhow::bail!("{} refused to start", self.name);
        }
        // Give any wrongly interleaved call a chance to run first.
        tokio::task::yield_now().await;
        self.record("started");
        Ok(())
    }

    async fn inject(&self, _registry: &Registry, _order: &Order) -> anyhow::Result<()> {
        self.record("inject");
        if self.fail == Some(Phase::Inject) {
            anyhow::bail!("{} refused to inject", self.name);
        }
        Ok(())
    }
}

/// Registry built directly from managers, in the given discovery order.
pub fn registry_with_managers<M>(managers: Vec<M>) -> Registry
where
    M: Into<Arc<dyn ModuleManager>>,
{
    let mut registry = Registry::new(Arc::new(HostContext::with_root("/srv/app")));
    for manager in managers {
        let manager: Arc<dyn ModuleManager> = manager.into();
        let name = manager.name().to_lowercase();
        let dependencies = manager
            .dependencies()
            .normalize(&name)
            .expect("valid test dependencies");
        registry.claim(Arc::new(ModuleDescriptor::new(
            name.clone(),
            ModuleKind::Local,
            registry.context().paths().module_dir(&name),
            Some(registry.context().paths().module_dir(&name).join(ENTRY_POINT_FILE)),
            dependencies,
            Some(manager),
        )));
        registry.complete(&name);
    }
    registry
}

/// Registry of stubs carrying only the given dependency declarations.
pub fn registry_of(modules: &[(&str, Dependencies)]) -> Registry {
    let mut registry = Registry::new(Arc::new(HostContext::with_root("/srv/app")));
    for (name, dependencies) in modules {
        registry.claim(Arc::new(ModuleDescriptor::new(
            name.to_string(),
            ModuleKind::Local,
            registry.context().paths().module_dir(name),
            None,
            dependencies.clone(),
            None,
        )));
        registry.complete(name);
    }
    registry
}

/// Application root whose modules folder holds one folder with an empty
/// manifest per name.
pub fn app_root(modules: &[&str]) -> TempDir {
    let root = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(root.path().join("modules")).expect("modules folder");
    for name in modules {
        let folder = root.path().join("modules").join(name);
        std::fs::create_dir_all(&folder).expect("module folder");
        std::fs::write(folder.join(ENTRY_POINT_FILE), "{}").expect("manifest");
    }
    root
}

/// Catalog of test managers that counts factory invocations per key.
pub struct CountingCatalog {
    catalog: FactoryCatalog,
    created: Arc<Mutex<HashMap<String, usize>>>,
    settings: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl CountingCatalog {
    pub fn new() -> Self {
        Self {
            catalog: FactoryCatalog::new(),
            created: Arc::default(),
            settings: Arc::default(),
        }
    }

    /// Register `manager` under its own name.
    pub fn with(self, manager: TestManager) -> Self {
        let key = manager.name.clone();
        self.with_key(&key, manager)
    }

    /// Register `manager` under `key`; each created manager takes the name
    /// of the module it is built for.
    pub fn with_key(mut self, key: &str, manager: TestManager) -> Self {
        let created = self.created.clone();
        let settings = self.settings.clone();
        let counter_key = key.to_string();
        self.catalog.register(key, move |_, info| {
            *created.lock().entry(counter_key.clone()).or_default() += 1;
            settings
                .lock()
                .insert(counter_key.clone(), info.settings.clone());
            let mut built = manager.clone();
            built.name = info.name.clone();
            Ok(built.into_arc())
        });
        self
    }

    pub fn catalog(&self) -> &FactoryCatalog {
        &self.catalog
    }

    pub fn created(&self, key: &str) -> usize {
        self.created.lock().get(key).copied().unwrap_or(0)
    }

    pub fn last_settings(&self, key: &str) -> Option<serde_json::Value> {
        self.settings.lock().get(key).cloned()
    }
}
