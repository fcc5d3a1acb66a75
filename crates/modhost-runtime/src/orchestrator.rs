//! Orchestrator: enumerates modules and drives them through their lifecycle.

use std::sync::Arc;

use modhost_core::Result;
use tracing::info;

use crate::catalog::FactoryCatalog;
use crate::context::HostContext;
use crate::descriptor::{Order, Registry};
use crate::discover::discover;
use crate::lifecycle;
use crate::order;
use crate::resolver::Resolver;

/// Entry point the host uses to bring up its modules.
pub struct Orchestrator {
    context: Arc<HostContext>,
    catalog: FactoryCatalog,
}

impl Orchestrator {
    pub fn new(context: Arc<HostContext>, catalog: FactoryCatalog) -> Self {
        info!(
            "Orchestrator initialized: modules={}, factories={}",
            context.paths().modules.display(),
            catalog.len()
        );
        Self { context, catalog }
    }

    pub fn context(&self) -> &Arc<HostContext> {
        &self.context
    }

    pub fn catalog(&self) -> &FactoryCatalog {
        &self.catalog
    }

    /// Resolve the selected modules (or every module folder when `explicit`
    /// is empty) with their dependency closures and compute the load order.
    ///
    /// Each call builds a fresh registry.
    pub async fn enumerate<S: AsRef<str>>(&self, explicit: &[S]) -> Result<(Registry, Order)> {
        let candidates = discover(&self.context.paths().modules, explicit).await?;

        let mut registry = Registry::new(self.context.clone());
        let mut resolver = Resolver::new(&self.catalog, &mut registry);
        for name in &candidates {
            resolver.resolve(name).await?;
        }

        let order = order::compute(&registry)?;
        info!(
            "Enumerated {} modules from {} candidates",
            registry.len(),
            candidates.len()
        );
        Ok((registry, order))
    }

    /// Start, then inject, every module in `order`.
    pub async fn start(&self, registry: &Registry, order: &Order) -> Result<Order> {
        lifecycle::run(registry, order).await
    }

    /// `enumerate` followed by `start`.
    pub async fn boot<S: AsRef<str>>(&self, explicit: &[S]) -> Result<(Registry, Order)> {
        let (registry, order) = self.enumerate(explicit).await?;
        let order = self.start(&registry, &order).await?;
        Ok((registry, order))
    }
}
