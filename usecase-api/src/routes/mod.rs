//! REST API Routes Module
//!
//! - Use case CRUD routes under /api/v1/usecases (auth required)
//! - Health check endpoints (public)
//! - OpenAPI document and optional Swagger UI
//! - CORS support for browser-based clients

pub mod health;
pub mod usecase;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use usecase_core::UseCaseService;
use utoipa::OpenApi;

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::openapi::ApiDoc;

pub use health::create_router as health_router;
pub use usecase::create_router as usecase_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builds the API router with authentication on every resource route.
///
/// Public routes (health, OpenAPI) are exempt from authentication.
pub struct SecureRouterBuilder {
    service: UseCaseService,
    api_config: ApiConfig,
    auth_state: AuthMiddlewareState,
}

impl SecureRouterBuilder {
    /// In production this refuses insecure secrets and open CORS.
    pub fn new(
        service: UseCaseService,
        api_config: ApiConfig,
        auth_config: AuthConfig,
    ) -> ApiResult<Self> {
        let is_production = api_config.is_production();
        auth_config.validate_for_production(is_production)?;
        api_config.validate_for_production()?;

        Ok(Self {
            service,
            auth_state: AuthMiddlewareState::new(auth_config),
            api_config,
        })
    }

    /// Resource routes (require authentication).
    fn build_resource_routes(&self) -> Router {
        usecase::create_router(
            self.service.clone(),
            self.api_config.user_permissions.clone(),
        )
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS (outermost) - handles preflight requests
    /// 2. Request tracing
    /// 3. Auth (innermost, only on /api/v1/*) - validates credentials
    pub fn build(self) -> Router {
        let api_routes = self
            .build_resource_routes()
            .layer(from_fn_with_state(self.auth_state.clone(), auth_middleware));

        #[allow(unused_mut)]
        let mut router = Router::new()
            .nest("/api/v1", api_routes)
            .nest("/health", health::create_router(self.service.store().clone()))
            .route("/openapi.json", get(openapi_json));

        #[cfg(feature = "swagger-ui")]
        {
            use utoipa_swagger_ui::SwaggerUi;
            router = router.merge(
                SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
            );
        }

        let cors = build_cors_layer(&self.api_config);

        router.layer(TraceLayer::new_for_http()).layer(cors)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow everything; otherwise exact and `*.domain` matches.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricted origins");
        let allowed = config.clone();
        let cors = cors.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| allowed.is_origin_allowed(o))
                .unwrap_or(false)
        }));

        if config.cors_allow_credentials {
            cors.allow_credentials(true)
        } else {
            cors
        }
    }
}

/// Create the complete API router.
///
/// - /api/v1/usecases/* (auth required)
/// - /health/* (public)
/// - /openapi.json
/// - /swagger-ui (when the swagger-ui feature is enabled)
pub fn create_api_router(
    service: UseCaseService,
    api_config: &ApiConfig,
    auth_config: AuthConfig,
) -> ApiResult<Router> {
    SecureRouterBuilder::new(service, api_config.clone(), auth_config).map(|builder| builder.build())
}
