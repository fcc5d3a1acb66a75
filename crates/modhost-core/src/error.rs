//! Error types for module discovery, resolution, ordering and lifecycle.

use std::path::PathBuf;

use thiserror::Error;

/// Lifecycle phase a module manager was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Inject,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Inject => write!(f, "inject"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Discovery error: cannot read modules folder {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error in module '{module}': {message}")]
    Config { module: String, message: String },

    #[error("Module not found: '{module}' (no folder at {})", path.display())]
    ModuleNotFound { module: String, path: PathBuf },

    #[error("Entry point error in module '{module}': {source}")]
    EntryPoint {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Dependency cycle between modules: {}", modules.join(", "))]
    Cycle { modules: Vec<String> },

    #[error("Ordering error: module '{dependent}' is ordered before its dependency '{dependency}'")]
    Ordering {
        dependent: String,
        dependency: String,
    },

    #[error("Lifecycle error: {phase} of module '{module}' failed: {source}")]
    Lifecycle {
        module: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error naming `module`.
    pub fn config(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Name of the module the error is attributed to, if any.
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Config { module, .. }
            | Self::ModuleNotFound { module, .. }
            | Self::EntryPoint { module, .. }
            | Self::Lifecycle { module, .. } => Some(module),
            Self::Ordering { dependent, .. } => Some(dependent),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
