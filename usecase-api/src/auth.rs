//! Authentication Module
//!
//! Bearer JWT authentication for the use case API. A token's `sub` claim is
//! the caller's user id and its `role` claim the account role; only verified
//! roles (user, admin) get past the middleware.

use crate::config::ConfigError;
use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use usecase_core::{Caller, Clock, Role, SystemClock};

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Minimum secret length accepted in production.
pub const MIN_SECRET_LEN: usize = 32;

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// Tolerated clock drift when checking `exp`, in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for token time validation
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<Clock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `USECASE_JWT_SECRET`: JWT signing secret
    /// - `USECASE_JWT_EXPIRATION_SECS`: JWT token expiration (default: 3600)
    /// - `USECASE_JWT_CLOCK_SKEW_SECS`: JWT clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("USECASE_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("USECASE_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("USECASE_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_secret(mut self, secret: JwtSecret) -> Self {
        self.jwt_secret = secret;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Refuse insecure secrets in production; warn about them elsewhere.
    pub fn validate_for_production(&self, is_production: bool) -> ApiResult<()> {
        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start server in production with insecure JWT secret. \
                     Set USECASE_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set USECASE_JWT_SECRET \
                 before deploying."
            );
        } else if self.jwt_secret.len() < MIN_SECRET_LEN {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least {} characters long.",
                    self.jwt_secret.len(),
                    MIN_SECRET_LEN
                )));
            }
            tracing::warn!(
                secret_len = self.jwt_secret.len(),
                "JWT secret is short; use at least {} characters in production",
                MIN_SECRET_LEN
            );
        }

        Ok(())
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims carried by every request token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Account role; absent means pending
    #[serde(default)]
    pub role: Role,
}

impl Claims {
    pub fn new(user_id: String, role: Role, expiration_secs: i64, clock: &dyn Clock) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: user_id,
            iat: now,
            exp: now + expiration_secs,
            role,
        }
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.exp < clock.now_epoch_secs()
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authenticated caller, injected into request extensions by the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Only verified accounts may call the API.
    pub fn require_verified(&self) -> ApiResult<()> {
        if self.role.is_verified() {
            Ok(())
        } else {
            Err(ApiError::unauthorized(
                "You do not have permission to access this resource",
            ))
        }
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id.clone(), self.role)
    }
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

/// Expiry check against our own clock, with skew tolerance.
fn validate_claim_times(now: i64, exp: i64, leeway_secs: i64) -> ApiResult<()> {
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }
    Ok(())
}

/// Validate a JWT token and extract claims.
///
/// `jsonwebtoken` only checks the signature here; expiry is checked against
/// the injected clock so tests stay deterministic.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })?;

    let claims = token_data.claims;
    let now = config.clock.now_epoch_secs();

    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    validate_claim_times(now, claims.exp, config.jwt_clock_skew_secs)?;

    Ok(claims)
}

/// Generate a signed JWT for a user.
pub fn generate_jwt_token(config: &AuthConfig, user_id: String, role: Role) -> ApiResult<String> {
    let claims = Claims::new(user_id, role, config.jwt_expiration_secs, &*config.clock);

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Authenticate a request from its `Authorization` header value.
///
/// Missing credentials, bad tokens, and unverified roles all fail with 401.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let auth_value = auth_header.ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an Authorization header")
    })?;

    let token = auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::invalid_token("Authorization header must use Bearer scheme")
    })?;

    let claims = validate_jwt_token(config, token)?;
    let context = AuthContext::new(claims.sub, claims.role);
    context.require_verified()?;
    Ok(context)
}
