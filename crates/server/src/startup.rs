use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::{AppConfig, DEV_JWT_SECRET};

use crate::errors::StartupError;
use crate::routes::{self, auth};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Shared state from a loaded config and an open pool.
pub fn build_state(cfg: &AppConfig, db: sea_orm::DatabaseConnection) -> auth::ServerState {
    auth::ServerState {
        db,
        auth: auth::ServerAuthConfig::from_config(&cfg.auth),
        uploads: Arc::new(cfg.uploads.clone()),
    }
}

/// Public entry: load config, connect and migrate, then run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();

    let cfg = AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    if cfg.auth.jwt_secret == DEV_JWT_SECRET {
        warn!("JWT secret not configured; using the development secret");
    }

    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.auto_migrate {
        migration::Migrator::up(&db, None).await?;
        info!("database migrations applied");
    }

    let state = build_state(&cfg, db);
    let app: Router = routes::build_router(build_cors(), state);

    let addr: SocketAddr = cfg.server.bind_addr().parse()?;
    info!(%addr, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
