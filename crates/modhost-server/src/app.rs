//! Host application assembly: module selection, router composition and the
//! `list` report.

use axum::Router;
use modhost_core::HostConfig;
use modhost_runtime::{discover, ModuleKind, Mount, Order};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::modules::BUILTINS;

/// Modules to boot: the explicit selection, or every folder under
/// `modules/`, followed by the built-ins.
pub async fn candidates(config: &HostConfig, explicit: &[String]) -> anyhow::Result<Vec<String>> {
    let mut names = if !explicit.is_empty() {
        explicit.to_vec()
    } else if config.paths.modules.is_dir() {
        discover::<String>(&config.paths.modules, &[]).await?
    } else {
        warn!(
            "No modules folder at {}, booting built-ins only",
            config.paths.modules.display()
        );
        Vec::new()
    };

    for builtin in BUILTINS {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(builtin)) {
            names.push(builtin.to_string());
        }
    }
    Ok(names)
}

/// Nest path for a mount prefix; `None` means merge at the root.
pub fn nest_path(prefix: Option<&str>) -> Option<String> {
    let trimmed = prefix?.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Compose every mounted module router into the host router.
pub fn build_router(mounts: Vec<Mount>) -> Router {
    let mut app = Router::new();
    for mount in mounts {
        match nest_path(mount.prefix.as_deref()) {
            Some(path) => {
                info!("Serving module '{}' under {}", mount.module, path);
                app = app.nest(&path, mount.router);
            }
            None => {
                info!("Serving module '{}' at root", mount.module);
                app = app.merge(mount.router);
            }
        }
    }
    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Render the load order for `modhost list`.
pub fn format_order(order: &Order) -> String {
    let mut out = String::new();
    for (i, (descriptor, score)) in order.scored().enumerate() {
        let kind = match (descriptor.is_stub(), descriptor.kind()) {
            (true, _) => "stub",
            (false, ModuleKind::Local) => "local",
            (false, ModuleKind::Qualified) => "qualified",
        };
        out.push_str(&format!(
            "{:>3}. {:<24} {:<10} score={}\n",
            i + 1,
            descriptor.name(),
            kind,
            score
        ));
    }
    out
}
