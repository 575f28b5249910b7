//! Use Case API Server Entry Point
//!
//! Bootstraps configuration, connects the store, and starts the Axum
//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use usecase_api::telemetry::{init_tracing, TelemetryConfig};
use usecase_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AuthConfig, DbClient, DbConfig,
    PgGroupDirectory, PgUseCaseStore,
};
use usecase_core::{GroupAccessPolicy, GroupDirectory, UseCaseService, UseCaseStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();

    let (store, groups) = build_storage().await?;
    let service = UseCaseService::new(store, Arc::new(GroupAccessPolicy::new(groups)));

    let app: Router = create_api_router(service, &api_config, auth_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, environment = %api_config.environment, "Starting Use Case API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

type Storage = (Arc<dyn UseCaseStore>, Arc<dyn GroupDirectory>);

/// Connect to PostgreSQL and make sure the use case table exists.
async fn build_storage() -> ApiResult<Storage> {
    #[cfg(feature = "dev")]
    if std::env::var("USECASE_DB_HOST").is_err() {
        tracing::warn!("USECASE_DB_HOST not set; using the in-memory store");
        return Ok((
            Arc::new(usecase_core::MemoryUseCaseStore::new()),
            Arc::new(usecase_core::MemoryGroupDirectory::default()),
        ));
    }

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    db.ensure_schema().await?;
    tracing::info!(pool_size = db.pool_size(), host = %db_config.host, "Database ready");

    Ok((
        Arc::new(PgUseCaseStore::new(db.clone())),
        Arc::new(PgGroupDirectory::new(db)),
    ))
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("USECASE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("USECASE_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str.parse::<u16>().map_err(|_| {
        ApiError::invalid_input(format!("Invalid port value: {}", port_str))
    })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
    })
}
