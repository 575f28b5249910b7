//! OpenAPI Specification for the Use Case API
//!
//! The document is generated by utoipa from the route annotations and the
//! schema derives on the core types.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{self, ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::usecase;
use usecase_core::{AccessControl, AccessRule, UseCase, UseCaseForm, UseCaseWithOwner, UserProfile};

/// OpenAPI document for the use case API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Use Case API",
        version = "0.1.0",
        description = "Named command templates owned by users, with per-record read/write access control",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Use Cases", description = "Command template management"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        // === Use Case Routes ===
        usecase::list_use_cases,
        usecase::list_use_cases_with_owner,
        usecase::create_use_case,
        usecase::get_use_case,
        usecase::update_use_case,
        usecase::delete_use_case,

        // === Health Routes ===
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(
        schemas(
            // === Error Types ===
            ApiError, ErrorCode,

            // === Use Case Types ===
            UseCase, UseCaseWithOwner, UseCaseForm, UserProfile, AccessControl, AccessRule,

            // === Health Types ===
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer JWT security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
