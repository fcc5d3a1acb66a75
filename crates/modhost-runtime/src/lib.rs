//! Module runtime: discovers feature modules, resolves their dependencies,
//! computes a load order and drives every module through start and inject.
//!
//! Control flow: [`discover`] → [`Resolver`] (fills a [`Registry`]) →
//! [`order::compute`] (yields an [`Order`]) → [`lifecycle::run`].
//! [`Orchestrator`] bundles all of it behind `enumerate` / `start`.

pub mod catalog;
pub mod context;
pub mod descriptor;
pub mod discover;
pub mod lifecycle;
pub mod manager;
pub mod order;
pub mod orchestrator;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testutil;

pub use catalog::{FactoryCatalog, ModuleFactory};
pub use context::{HostContext, Mount};
pub use descriptor::{ModuleDescriptor, ModuleKind, Order, Registry};
pub use discover::discover;
pub use manager::{Dependencies, DependencyManagers, ModuleInfo, ModuleManager};
pub use orchestrator::Orchestrator;
pub use resolver::Resolver;

pub use modhost_core::{Error, Phase, Result};
