//! Recursive, memoized module resolution.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use modhost_core::{Error, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{FactoryCatalog, ModuleFactory};
use crate::descriptor::{ModuleDescriptor, ModuleKind, Registry};
use crate::manager::{Dependencies, ModuleInfo};

/// Conventional entry point file inside a local module's folder.
pub const ENTRY_POINT_FILE: &str = "module.json";

/// Separates package and path in a qualified module name.
const QUALIFIER: char = ':';

/// Contents of a local module's entry point file.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    /// Catalog key of the factory; defaults to the module name.
    #[serde(default)]
    factory: Option<String>,
    #[serde(default)]
    settings: serde_json::Value,
}

/// A module name split by kind, case preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ModuleRef<'a> {
    Local(&'a str),
    Qualified { package: &'a str, path: &'a str },
}

impl<'a> ModuleRef<'a> {
    fn parse(name: &'a str) -> Result<Self> {
        if let Some((package, path)) = name.split_once(QUALIFIER) {
            if !package.is_empty() && !package.contains('/') && !path.is_empty() {
                return Ok(Self::Qualified { package, path });
            }
        }

        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', QUALIFIER]);
        if invalid {
            return Err(Error::config(name, "invalid module name"));
        }
        Ok(Self::Local(name))
    }
}

/// Where a module lives and what, if anything, builds its manager.
struct Located {
    kind: ModuleKind,
    location: PathBuf,
    entry_point: Option<PathBuf>,
    factory: Option<Arc<dyn ModuleFactory>>,
    settings: serde_json::Value,
}

/// Resolves module names into descriptors, filling a registry.
///
/// When `resolve` returns, the module and its whole dependency closure are
/// in the registry. Each name is located and built at most once; asking for
/// a name that is still in flight (a dependency cycle) returns the same
/// descriptor instead of recursing.
///
/// Folders are looked up with the name as requested or declared; only the
/// registry key is lowercased. A requested module must have a folder, while
/// a dependency without one becomes a stub.
pub struct Resolver<'a> {
    catalog: &'a FactoryCatalog,
    registry: &'a mut Registry,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a FactoryCatalog, registry: &'a mut Registry) -> Self {
        Self { catalog, registry }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Resolve an explicitly requested module.
    pub fn resolve<'b>(&'b mut self, name: &'b str) -> BoxFuture<'b, Result<Arc<ModuleDescriptor>>> {
        Box::pin(self.resolve_inner(name, true))
    }

    fn resolve_dependency<'b>(
        &'b mut self,
        name: &'b str,
    ) -> BoxFuture<'b, Result<Arc<ModuleDescriptor>>> {
        Box::pin(self.resolve_inner(name, false))
    }

    async fn resolve_inner(&mut self, name: &str, requested: bool) -> Result<Arc<ModuleDescriptor>> {
        let key = name.to_lowercase();

        if let Some(existing) = self.registry.get(&key) {
            if self.registry.is_in_flight(&key) {
                debug!("Module '{}' requested while still resolving", key);
            }
            return Ok(existing.clone());
        }

        let located = self.locate(&key, ModuleRef::parse(name)?, requested).await?;

        let manager = match (&located.factory, &located.entry_point) {
            (Some(factory), Some(entry_point)) => {
                let info = ModuleInfo {
                    name: key.clone(),
                    location: located.location.clone(),
                    entry_point: entry_point.clone(),
                    settings: located.settings.clone(),
                };
                let manager = factory
                    .create(self.registry.context(), &info)
                    .map_err(|source| Error::EntryPoint {
                        module: key.clone(),
                        source,
                    })?;
                Some(manager)
            }
            _ => None,
        };

        let declared = match &manager {
            Some(manager) => manager.dependencies(),
            None => Dependencies::None,
        };
        let lookup: Vec<String> = declared
            .names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        let dependencies = declared.normalize(&key)?;

        match &manager {
            Some(_) => info!("Resolved module '{}' ({:?})", key, dependencies),
            None => info!("Resolved module '{}' as stub", key),
        }

        let descriptor = Arc::new(ModuleDescriptor::new(
            key.clone(),
            located.kind,
            located.location,
            located.entry_point,
            dependencies,
            manager,
        ));

        // Claimed before recursing so cycles end at the in-flight entry.
        self.registry.claim(descriptor.clone());

        for dependency in &lookup {
            self.resolve_dependency(dependency).await?;
        }

        self.registry.complete(&key);
        Ok(descriptor)
    }

    async fn locate(&self, key: &str, module: ModuleRef<'_>, requested: bool) -> Result<Located> {
        match module {
            ModuleRef::Qualified { package, path } => {
                let catalog_key = format!("{package}/{path}");
                let factory = self.catalog.get(&catalog_key).ok_or_else(|| Error::EntryPoint {
                    module: key.to_string(),
                    source: anyhow::anyhow!("no factory registered for '{}'", catalog_key),
                })?;
                Ok(Located {
                    kind: ModuleKind::Qualified,
                    location: self.registry.context().paths().root.clone(),
                    entry_point: Some(PathBuf::from(package).join(path)),
                    factory: Some(factory),
                    settings: serde_json::Value::Null,
                })
            }
            ModuleRef::Local(folder_name) => {
                let location = self.registry.context().paths().module_dir(folder_name);
                let is_dir = match tokio::fs::metadata(&location).await {
                    Ok(meta) => meta.is_dir(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                    Err(e) => return Err(e.into()),
                };
                if !is_dir {
                    if requested {
                        return Err(Error::ModuleNotFound {
                            module: key.to_string(),
                            path: location,
                        });
                    }
                    debug!("Dependency '{}' has no folder at {}", key, location.display());
                    return Ok(Located {
                        kind: ModuleKind::Local,
                        location,
                        entry_point: None,
                        factory: None,
                        settings: serde_json::Value::Null,
                    });
                }

                let entry_point = location.join(ENTRY_POINT_FILE);
                let bytes = match tokio::fs::read(&entry_point).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Ok(Located {
                            kind: ModuleKind::Local,
                            location,
                            entry_point: None,
                            factory: None,
                            settings: serde_json::Value::Null,
                        });
                    }
                    Err(e) => {
                        return Err(Error::EntryPoint {
                            module: key.to_string(),
                            source: e.into(),
                        })
                    }
                };

                let manifest: Manifest = if bytes.iter().all(u8::is_ascii_whitespace) {
                    Manifest::default()
                } else {
                    serde_json::from_slice(&bytes).map_err(|e| Error::EntryPoint {
                        module: key.to_string(),
                        source: anyhow::Error::new(e)
                            .context(format!("invalid {}", entry_point.display())),
                    })?
                };

                let factory_key = manifest.factory.as_deref().unwrap_or(key);
                let factory = self.catalog.get(factory_key).ok_or_else(|| Error::EntryPoint {
                    module: key.to_string(),
                    source: anyhow::anyhow!("no factory registered for '{}'", factory_key),
                })?;

                Ok(Located {
                    kind: ModuleKind::Local,
                    location,
                    entry_point: Some(entry_point),
                    factory: Some(factory),
                    settings: manifest.settings,
                })
            }
        }
    }
}
