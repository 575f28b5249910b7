//! API Configuration Module
//!
//! This module provides configuration for CORS, default workspace
//! permissions, and the deployment environment. Configuration is loaded from
//! environment variables with sensible defaults for development.

use serde_json::{json, Value as JsonValue};
use thiserror::Error;

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

/// Configuration errors raised while reading the environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Permissions granted to every verified user unless a group says otherwise.
pub fn default_user_permissions() -> JsonValue {
    json!({
        "workspace": {
            "use_cases": false
        }
    })
}

/// API configuration for CORS, default permissions, and production hardening.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Authorization Defaults
    // ========================================================================
    /// Default permission document merged with group grants.
    pub user_permissions: JsonValue,

    /// Deployment environment name ("development", "production", ...).
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours
            user_permissions: default_user_permissions(),
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `USECASE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `USECASE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `USECASE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `USECASE_USER_PERMISSIONS`: JSON permission document for verified users
    /// - `USECASE_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Result<Self, ConfigError> {
        let cors_origins = std::env::var("USECASE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("USECASE_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("USECASE_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let user_permissions = match std::env::var("USECASE_USER_PERMISSIONS") {
            Ok(raw) if !raw.trim().is_empty() => parse_user_permissions(&raw)?,
            _ => default_user_permissions(),
        };

        let environment = std::env::var("USECASE_ENVIRONMENT")
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            user_permissions,
            environment,
        })
    }

    /// Check if running in a production environment.
    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }

    /// Production deployments must pin their CORS origins.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.is_production() && self.cors_origins.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "USECASE_CORS_ORIGINS".to_string(),
            });
        }
        Ok(())
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain
                        .strip_suffix(pattern)
                        .is_some_and(|sub| sub.ends_with('.'));
                }
            }
            false
        })
    }
}

/// Parse a permission document; it must be a JSON object.
fn parse_user_permissions(raw: &str) -> Result<JsonValue, ConfigError> {
    let value: JsonValue = serde_json::from_str(raw).map_err(|e| {
        ConfigError::invalid("USECASE_USER_PERMISSIONS", raw, e.to_string())
    })?;

    if !value.is_object() {
        return Err(ConfigError::invalid(
            "USECASE_USER_PERMISSIONS",
            raw,
            "expected a JSON object",
        ));
    }
    Ok(value)
}
