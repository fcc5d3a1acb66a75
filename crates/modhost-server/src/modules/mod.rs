//! Modules compiled into the host binary.

pub mod health;
pub mod status;

use std::sync::Arc;

use modhost_runtime::{FactoryCatalog, ModuleManager};

/// Built-in modules every host boots alongside the application's own.
/// `builtin:status` pulls in `builtin:health`.
pub const BUILTINS: &[&str] = &[status::NAME];

/// Catalog of every factory the host knows about.
pub fn catalog() -> FactoryCatalog {
    let mut catalog = FactoryCatalog::new();
    catalog
        .register("builtin/health", |_, info| {
            Ok(Arc::new(health::HealthModule::new(&info.name)) as Arc<dyn ModuleManager>)
        })
        .register("builtin/status", |_, info| {
            Ok(Arc::new(status::StatusModule::new(&info.name)) as Arc<dyn ModuleManager>)
        });
    catalog
}
