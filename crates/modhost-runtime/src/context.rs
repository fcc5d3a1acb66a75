//! Host context shared with module factories and managers.

use std::future::Future;
use std::path::{Path, PathBuf};

use axum::Router;
use futures::future::BoxFuture;
use modhost_core::{HostPaths, Result};
use parking_lot::Mutex;
use tracing::{info, warn};

type ShutdownHook = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A router a module attached during its inject phase.
pub struct Mount {
    pub module: String,
    /// `None` (or `/`) merges the router at the root.
    pub prefix: Option<String>,
    pub router: Router,
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("module", &self.module)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Everything the host exposes to modules: folders, the mount table and
/// shutdown hooks.
pub struct HostContext {
    paths: HostPaths,
    mounts: Mutex<Vec<Mount>>,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
}

impl HostContext {
    pub fn new(paths: HostPaths) -> Self {
        Self {
            paths,
            mounts: Mutex::new(Vec::new()),
            shutdown_hooks: Mutex::new(Vec::new()),
        }
    }

    /// Context rooted at `root` using the conventional folder layout.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self::new(HostPaths::new(root))
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    /// Library folder of a local module (`modules/<name>/lib`).
    pub fn module_lib_dir(&self, module: &str) -> PathBuf {
        self.paths.module_dir(module).join("lib")
    }

    /// Load `config/<name>.json`. A missing file yields `None`.
    pub async fn config(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let path = self.paths.config.join(format!("{name}.json"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Register a router to be served under `prefix`.
    pub fn mount(&self, module: &str, prefix: Option<String>, router: Router) {
        info!(
            "Module '{}' mounted at {}",
            module,
            prefix.as_deref().unwrap_or("/")
        );
        self.mounts.lock().push(Mount {
            module: module.to_string(),
            prefix,
            router,
        });
    }

    /// Module names and prefixes mounted so far, in mount order.
    pub fn mounted(&self) -> Vec<(String, Option<String>)> {
        self.mounts
            .lock()
            .iter()
            .map(|m| (m.module.clone(), m.prefix.clone()))
            .collect()
    }

    /// Drain the mount table for composing the host router.
    pub fn take_mounts(&self) -> Vec<Mount> {
        std::mem::take(&mut *self.mounts.lock())
    }

    /// Register an action to run when the host shuts down.
    pub fn on_shutdown<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let boxed: ShutdownHook = Box::new(move || -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(hook())
        });
        self.shutdown_hooks.lock().push(boxed);
    }

    /// Run all shutdown hooks in registration order. Failures are logged and
    /// do not stop later hooks; returns the number of failed hooks.
    pub async fn run_shutdown_hooks(&self) -> usize {
        let hooks = std::mem::take(&mut *self.shutdown_hooks.lock());
        let mut failed = 0;
        for hook in hooks {
            if let Err(e) = hook().await {
                warn!("Shutdown action failed: {:#}", e);
                failed += 1;
            }
        }
        failed
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("paths", &self.paths)
            .field("mounts", &self.mounts.lock().len())
            .finish_non_exhaustive()
    }
}
