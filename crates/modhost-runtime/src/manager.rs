//! Module manager contract implemented by every feature module.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use modhost_core::{Error, Result};

use crate::descriptor::{Order, Registry};

/// Managers of the modules a module declared as dependencies, keyed by name.
pub type DependencyManagers = HashMap<String, Arc<dyn ModuleManager>>;

/// What a module declares about the modules it relies on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dependencies {
    /// No dependencies; the module is elevated by modules depending on it.
    #[default]
    None,
    /// Names of modules that must be started before this one.
    Modules(Vec<String>),
    /// Fixed ordering score, never above zero; not raised by dependents and
    /// contributes no edges.
    Priority(i64),
}

impl Dependencies {
    pub fn modules<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Modules(names.into_iter().map(Into::into).collect())
    }

    /// Declared dependency names; empty unless this is a name list.
    pub fn names(&self) -> &[String] {
        match self {
            Self::Modules(names) => names,
            _ => &[],
        }
    }

    pub fn priority(&self) -> Option<i64> {
        match self {
            Self::Priority(value) => Some(*value),
            _ => None,
        }
    }

    /// Lowercase and dedupe names, rejecting blank ones. An empty list
    /// collapses to [`Dependencies::None`]. A priority can only lower a
    /// module, so positive values are negated.
    pub(crate) fn normalize(self, module: &str) -> Result<Self> {
        match self {
            Self::Modules(names) => {
                let mut normalized: Vec<String> = Vec::with_capacity(names.len());
                for name in names {
                    let name = name.trim().to_lowercase();
                    if name.is_empty() {
                        return Err(Error::config(module, "blank dependency name"));
                    }
                    if !normalized.contains(&name) {
                        normalized.push(name);
                    }
                }
                if normalized.is_empty() {
                    Ok(Self::None)
                } else {
                    Ok(Self::Modules(normalized))
                }
            }
            Self::Priority(value) if value > 0 => Ok(Self::Priority(-value)),
            other => Ok(other),
        }
    }
}

/// Partially-built descriptor handed to a module factory.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Canonical lowercase module name.
    pub name: String,
    /// Folder the module lives in (application root for qualified modules).
    pub location: PathBuf,
    /// Entry point the factory was found through.
    pub entry_point: PathBuf,
    /// Free-form settings from the module's manifest, `Null` if none.
    pub settings: serde_json::Value,
}

/// Runtime object a module's entry point produces.
///
/// All modules are started in load order before any of them is injected.
#[async_trait]
pub trait ModuleManager: Send + Sync {
    fn name(&self) -> &str;

    /// Modules this one relies on. Names are lowercased before use.
    fn dependencies(&self) -> Dependencies {
        Dependencies::None
    }

    /// Wire internal state. `dependencies` holds the managers of declared
    /// dependencies, all of which have been started already.
    async fn start(
        &self,
        _dependencies: &DependencyManagers,
        _registry: &Registry,
        _order: &Order,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Attach request handling to the host. Runs once every module started.
    async fn inject(&self, registry: &Registry, _order: &Order) -> anyhow::Result<()> {
        if let Some(router) = self.router().await? {
            registry
                .context()
                .mount(self.name(), self.router_prefix(), router);
        }
        Ok(())
    }

    async fn router(&self) -> anyhow::Result<Option<Router>> {
        Ok(None)
    }

    /// Path the router is mounted at; `None` mounts at the root.
    fn router_prefix(&self) -> Option<String> {
        Some(format!("/{}", self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_dedupes() {
        let deps = Dependencies::modules(["Auth", "auth", " Menu "])
            .normalize("blog")
            .unwrap();
        assert_eq!(deps, Dependencies::modules(["auth", "menu"]));
    }

    #[test]
    fn test_normalize_empty_list_is_none() {
        let deps = Dependencies::Modules(Vec::new()).normalize("blog").unwrap();
        assert_eq!(deps, Dependencies::None);
        assert!(deps.names().is_empty());
    }

    #[test]
    fn test_normalize_rejects_blank_name() {
        let err = Dependencies::modules(["auth", "  "])
            .normalize("blog")
            .unwrap_err();
        assert!(matches!(err, Error::Config { ref module, .. } if module == "blog"));
    }

    #[test]
    fn test_positive_priority_is_negated() {
        let deps = Dependencies::Priority(5).normalize("tail").unwrap();
        assert_eq!(deps, Dependencies::Priority(-5));
        let deps = Dependencies::Priority(0).normalize("tail").unwrap();
        assert_eq!(deps, Dependencies::Priority(0));
    }

    #[test]
    fn test_priority_is_kept() {
        let deps = Dependencies::Priority(-5).normalize("late").unwrap();
        assert_eq!(deps.priority(), Some(-5));
        assert!(deps.names().is_empty());
    }
}
