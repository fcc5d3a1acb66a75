//! `builtin:health`: liveness endpoint.

use async_trait::async_trait;
use axum::routing::get;
use axum::{Json, Router};
use modhost_runtime::ModuleManager;

pub const NAME: &str = "builtin:health";

pub struct HealthModule {
    name: String,
}

impl HealthModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ModuleManager for HealthModule {
    fn name(&self) -> &str {
        &self.name
    }

    async fn router(&self) -> anyhow::Result<Option<Router>> {
        Ok(Some(Router::new().route("/health", get(health))))
    }

    fn router_prefix(&self) -> Option<String> {
        None
    }
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}
