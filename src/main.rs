use anyhow::{Context, Result};
use axum::Router;
use car_rental::{
    config::{AppConfig, ServiceConfig},
    db::{self, Schema},
    identity_app, inventory_app,
    state::{IdentityState, InventoryState},
};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    let service = cfg.service().clone();
    tracing::info!(?cfg, "starting {} service", service.name);

    // --- Initialize SQLite connection ---
    let schema = match cfg {
        AppConfig::Identity { .. } => Schema::Identity,
        AppConfig::Inventory { .. } => Schema::Inventory,
    };
    let db = db::connect(&service.database_url, 5)
        .await
        .with_context(|| format!("opening database {}", service.database_url))?;

    // --- Handle migration mode ---
    if service.migrate {
        db::run_migrations(&db, schema).await?;
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Build router ---
    let app: Router = match cfg {
        AppConfig::Identity { token, hashing, .. } => {
            identity_app(IdentityState::new(db, &token, hashing)?)
        }
        AppConfig::Inventory {
            token, verifier, ..
        } => {
            tracing::info!(
                endpoint = %verifier.endpoint,
                timeout = ?verifier.timeout,
                "remote verification configured"
            );
            inventory_app(InventoryState::new(db, &token, &verifier)?)
        }
    };

    // --- Start server ---
    let listener = bind(&service).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn bind(service: &ServiceConfig) -> Result<TcpListener> {
    let addr = service.addr();
    match TcpListener::bind(&addr).await {
        Ok(listener) => Ok(listener),
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(service.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", service.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            Ok(TcpListener::bind(&fallback_addr).await?)
        }
        Err(err) => Err(err).with_context(|| format!("binding {addr}")),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
