//! Configuration and application folder conventions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Conventional folders of a host application root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPaths {
    /// Application root; qualified module names resolve relative to it.
    pub root: PathBuf,
    /// Shared library code (`lib/`).
    pub lib: PathBuf,
    /// JSON configuration files (`config/`).
    pub config: PathBuf,
    /// Runtime data (`data/`).
    pub data: PathBuf,
    /// Application-wide views (`views/`).
    pub views: PathBuf,
    /// One subfolder per local module (`modules/`).
    pub modules: PathBuf,
}

impl HostPaths {
    /// Derive all folders from an application root. Nothing is created.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            lib: root.join("lib"),
            config: root.join("config"),
            data: root.join("data"),
            views: root.join("views"),
            modules: root.join("modules"),
            root,
        }
    }

    /// Folder of a local module.
    pub fn module_dir(&self, name: &str) -> PathBuf {
        self.modules.join(name)
    }
}

/// Top-level host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// HTTP server port.
    pub port: u16,
    /// Application folders.
    pub paths: HostPaths,
    /// Explicit module selection; empty means "scan the modules folder".
    pub modules: Vec<String>,
}

impl HostConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(root: impl AsRef<Path>) -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let modules = std::env::var("MODHOST_MODULES")
            .map(|v| parse_module_list(&v))
            .unwrap_or_default();

        Self {
            port,
            paths: HostPaths::new(root),
            modules,
        }
    }
}

/// Split a comma-separated module selection, dropping blank entries.
pub fn parse_module_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
