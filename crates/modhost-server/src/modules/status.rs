//! `builtin:status`: reports the module load order the host booted with.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use modhost_runtime::{
    Dependencies, DependencyManagers, ModuleKind, ModuleManager, Order, Registry,
};
use parking_lot::RwLock;
use serde::Serialize;

use super::health;

pub const NAME: &str = "builtin:status";

type Snapshot = Arc<RwLock<Option<StatusReport>>>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub started_at: DateTime<Utc>,
    pub modules: Vec<ModuleStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub kind: &'static str,
    pub stub: bool,
    pub score: i64,
}

impl StatusReport {
    pub fn from_order(order: &Order) -> Self {
        let modules = order
            .scored()
            .map(|(descriptor, score)| ModuleStatus {
                name: descriptor.name().to_string(),
                kind: match descriptor.kind() {
                    ModuleKind::Local => "local",
                    ModuleKind::Qualified => "qualified",
                },
                stub: descriptor.is_stub(),
                score,
            })
            .collect();
        Self {
            started_at: Utc::now(),
            modules,
        }
    }
}

pub struct StatusModule {
    name: String,
    snapshot: Snapshot,
}

impl StatusModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            snapshot: Snapshot::default(),
        }
    }
}

#[async_trait]
impl ModuleManager for StatusModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::modules([health::NAME])
    }

    async fn start(
        &self,
        _dependencies: &DependencyManagers,
        _registry: &Registry,
        order: &Order,
    ) -> anyhow::Result<()> {
        *self.snapshot.write() = Some(StatusReport::from_order(order));
        Ok(())
    }

    async fn router(&self) -> anyhow::Result<Option<Router>> {
        let router = Router::new()
            .route("/status", get(status))
            .with_state(self.snapshot.clone());
        Ok(Some(router))
    }

    fn router_prefix(&self) -> Option<String> {
        None
    }
}

/// GET /status
async fn status(
    State(snapshot): State<Snapshot>,
) -> Result<Json<StatusReport>, StatusCode> {
    snapshot
        .read()
        .clone()
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}
