//! Two-phase module lifecycle: start every module, then inject every module.
//!
//! Both passes follow the computed order, one module at a time, and the
//! inject pass begins only after every start call has completed. The first
//! failure aborts the remaining sequence; modules already started stay
//! started.

use modhost_core::{Error, Phase, Result};
use tracing::{debug, info};

use crate::descriptor::{ModuleDescriptor, Order, Registry};
use crate::manager::DependencyManagers;

/// Run both phases and hand back the order on success.
pub async fn run(registry: &Registry, order: &Order) -> Result<Order> {
    start_all(registry, order).await?;
    inject_all(registry, order).await?;
    info!("{} modules started and injected", order.len());
    Ok(order.clone())
}

/// Start phase: each manager gets the managers of its declared dependencies.
pub async fn start_all(registry: &Registry, order: &Order) -> Result<()> {
    for descriptor in order.iter() {
        let Some(manager) = descriptor.manager() else {
            debug!("Skipping stub module '{}'", descriptor.name());
            continue;
        };

        info!("Starting module: {}", descriptor.name());
        let dependencies = dependency_managers(registry, descriptor);
        manager
            .start(&dependencies, registry, order)
            .await
            .map_err(|source| Error::Lifecycle {
                module: descriptor.name().to_string(),
                phase: Phase::Start,
                source,
            })?;
    }
    Ok(())
}

/// Inject phase: attach request handling, in the same order.
pub async fn inject_all(registry: &Registry, order: &Order) -> Result<()> {
    for descriptor in order.iter() {
        let Some(manager) = descriptor.manager() else {
            continue;
        };

        debug!("Injecting module: {}", descriptor.name());
        manager
            .inject(registry, order)
            .await
            .map_err(|source| Error::Lifecycle {
                module: descriptor.name().to_string(),
                phase: Phase::Inject,
                source,
            })?;
    }
    Ok(())
}

/// Managers of the descriptor's declared dependencies. Stubs have none and
/// numeric priorities declare no dependencies, so neither shows up here.
fn dependency_managers(registry: &Registry, descriptor: &ModuleDescriptor) -> DependencyManagers {
    descriptor
        .dependencies()
        .names()
        .iter()
        .filter_map(|name| {
            registry
                .manager(name)
                .map(|manager| (name.clone(), manager.clone()))
        })
        .collect()
}
