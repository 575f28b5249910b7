//! Use Case API - REST layer for command templates
//!
//! Exposes the use case resource over Axum with bearer authentication,
//! per-record access control, and health endpoints. Storage is PostgreSQL
//! through deadpool; the in-memory store backs tests and the dev server.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, Claims,
    JwtSecret,
};
pub use config::{ApiConfig, ConfigError};
pub use db::{DbClient, DbConfig, PgGroupDirectory, PgUseCaseStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, SecureRouterBuilder};
