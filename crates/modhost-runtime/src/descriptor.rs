//! Module descriptors, the registry they live in, and the computed order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::context::HostContext;
use crate::manager::{Dependencies, ModuleManager};

/// How a module name is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Subfolder of the modules folder.
    Local,
    /// `package:path` reference resolved against the application root.
    Qualified,
}

/// The orchestrator's record of one module.
///
/// A descriptor holds no reference back to its [`Registry`]; managers get
/// the registry as an argument to `start` and `inject` instead.
pub struct ModuleDescriptor {
    name: String,
    kind: ModuleKind,
    location: PathBuf,
    entry_point: Option<PathBuf>,
    dependencies: Dependencies,
    manager: Option<Arc<dyn ModuleManager>>,
    order: OnceLock<Vec<String>>,
}

impl ModuleDescriptor {
    pub(crate) fn new(
        name: String,
        kind: ModuleKind,
        location: PathBuf,
        entry_point: Option<PathBuf>,
        dependencies: Dependencies,
        manager: Option<Arc<dyn ModuleManager>>,
    ) -> Self {
        Self {
            name,
            kind,
            location,
            entry_point,
            dependencies,
            manager,
            order: OnceLock::new(),
        }
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Entry point the manager came from; `None` for stubs.
    pub fn entry_point(&self) -> Option<&Path> {
        self.entry_point.as_deref()
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn manager(&self) -> Option<&Arc<dyn ModuleManager>> {
        self.manager.as_ref()
    }

    /// A stub only satisfies other modules' dependency edges.
    pub fn is_stub(&self) -> bool {
        self.manager.is_none()
    }

    /// Names of all modules in load order, once the order has been computed.
    pub fn order(&self) -> Option<&[String]> {
        self.order.get().map(Vec::as_slice)
    }

    /// Record the load order. A descriptor belongs to one enumeration run,
    /// so only the first call takes effect; returns whether it did.
    pub(crate) fn set_order(&self, names: Vec<String>) -> bool {
        self.order.set(names).is_ok()
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("entry_point", &self.entry_point)
            .field("dependencies", &self.dependencies)
            .field("stub", &self.is_stub())
            .finish()
    }
}

/// All descriptors of one enumeration run, keyed by name and kept in
/// discovery order.
///
/// A name is written once. Names whose dependencies are still being resolved
/// are tracked as in flight.
pub struct Registry {
    context: Arc<HostContext>,
    modules: Vec<Arc<ModuleDescriptor>>,
    index: HashMap<String, usize>,
    in_flight: HashSet<String>,
}

impl Registry {
    pub fn new(context: Arc<HostContext>) -> Self {
        Self {
            context,
            modules: Vec::new(),
            index: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    pub fn context(&self) -> &Arc<HostContext> {
        &self.context
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.position(name).map(|i| &self.modules[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Manager of `name`, if the module exists and is not a stub.
    pub fn manager(&self, name: &str) -> Option<&Arc<dyn ModuleManager>> {
        self.get(name).and_then(|d| d.manager())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Descriptors in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> {
        self.modules.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|d| d.name()).collect()
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.in_flight.contains(&name.to_lowercase())
    }

    /// Discovery index of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        match self.index.get(name) {
            Some(i) => Some(*i),
            None => self.index.get(&name.to_lowercase()).copied(),
        }
    }

    /// Claim the descriptor's name and mark it in flight.
    pub(crate) fn claim(&mut self, descriptor: Arc<ModuleDescriptor>) {
        let name = descriptor.name().to_string();
        debug_assert!(!self.index.contains_key(&name), "module claimed twice");
        self.index.insert(name.clone(), self.modules.len());
        self.modules.push(descriptor);
        self.in_flight.insert(name);
    }

    /// Mark `name` as fully resolved, including its dependencies.
    pub(crate) fn complete(&mut self, name: &str) {
        self.in_flight.remove(name);
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.names())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

/// Load order over all descriptors of a registry, with each module's score.
#[derive(Clone)]
pub struct Order {
    modules: Arc<[Arc<ModuleDescriptor>]>,
    scores: Arc<[i64]>,
}

impl Order {
    pub(crate) fn new(modules: Vec<Arc<ModuleDescriptor>>, scores: Vec<i64>) -> Self {
        debug_assert_eq!(modules.len(), scores.len());
        Self {
            modules: modules.into(),
            scores: scores.into(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> {
        self.modules.iter()
    }

    /// Descriptors paired with their ordering score.
    pub fn scored(&self) -> impl Iterator<Item = (&Arc<ModuleDescriptor>, i64)> {
        self.modules.iter().zip(self.scores.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|d| d.name()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.modules.iter().position(|d| d.name() == name)
    }

    pub fn score(&self, name: &str) -> Option<i64> {
        self.position(name).map(|i| self.scores[i])
    }

    /// Whether both orders list the same descriptors in the same sequence.
    pub fn same_as(&self, other: &Order) -> bool {
        Arc::ptr_eq(&self.modules, &other.modules)
            || (self.len() == other.len()
                && self
                    .iter()
                    .zip(other.iter())
                    .all(|(a, b)| Arc::ptr_eq(a, b)))
    }
}

impl std::fmt::Debug for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
