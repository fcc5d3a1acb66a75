//! modhost: boots an application's feature modules and serves their routes.

use std::path::PathBuf;
use std::sync::Arc;

use modhost_core::HostConfig;
use modhost_runtime::{HostContext, Orchestrator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod modules;

fn resolve_root() -> PathBuf {
    std::env::var("MODHOST_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn print_help() {
    println!("modhost: feature module host");
    println!();
    println!("Usage: modhost [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Boot all modules and start the server");
    println!("  list [module...]         Print the computed load order");
    println!("  help                     Show this help message");
    println!();
    println!("Environment:");
    println!("  MODHOST_ROOT             Application root (default: .)");
    println!("  MODHOST_MODULES          Comma-separated module selection");
    println!("  PORT                     HTTP port (default: 3000)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let root = resolve_root();
    let config = HostConfig::from_env(&root);
    let context = Arc::new(HostContext::new(config.paths.clone()));
    let orchestrator = Orchestrator::new(context.clone(), modules::catalog());

    if args.len() > 1 {
        match args[1].as_str() {
            "list" => {
                let explicit = if args.len() > 2 {
                    args[2..].to_vec()
                } else {
                    config.modules.clone()
                };
                let names = app::candidates(&config, &explicit).await?;
                let (_, order) = orchestrator.enumerate(&names).await?;
                print!("{}", app::format_order(&order));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'modhost help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    info!("Application root: {}", config.paths.root.display());

    let names = app::candidates(&config, &config.modules).await?;
    let (registry, order) = orchestrator.boot(&names).await?;
    info!("Booted {} modules ({} in order)", registry.len(), order.len());

    let router = app::build_router(context.take_mounts());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("modhost listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
        })
        .await?;

    let failed = context.run_shutdown_hooks().await;
    if failed > 0 {
        warn!("{} shutdown actions failed", failed);
    }

    Ok(())
}
