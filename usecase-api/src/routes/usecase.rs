//! Use Case REST API Routes
//!
//! Handlers for the `/api/v1/usecases` resource. Every route runs behind
//! `auth_middleware`, so handlers only see verified callers.
//!
//! Missing records and denied access both answer 401.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use usecase_core::{
    normalize_command, Permission, StoreError, UseCase, UseCaseForm, UseCaseService,
    UseCaseWithOwner,
};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthExtractor;

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared state for use case routes.
#[derive(Clone)]
pub struct UseCaseState {
    pub service: UseCaseService,
    /// Default permission document checked on create
    pub user_permissions: JsonValue,
}

impl UseCaseState {
    pub fn new(service: UseCaseService, user_permissions: JsonValue) -> Self {
        Self {
            service,
            user_permissions,
        }
    }

    /// Fetch a record by path command or fail with 401.
    async fn require(&self, command: &str) -> ApiResult<UseCase> {
        self.service
            .get(command)
            .await?
            .ok_or_else(|| ApiError::use_case_not_found(command))
    }
}

/// Both write paths require a non-blank title.
fn require_title(form: &UseCaseForm) -> ApiResult<()> {
    if form.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    Ok(())
}

/// Validate and normalize a create body.
fn prepare_create_form(mut form: UseCaseForm) -> ApiResult<UseCaseForm> {
    let command = form.command.trim();
    if command.trim_start_matches('/').is_empty() {
        return Err(ApiError::missing_field("command"));
    }
    require_title(&form)?;

    form.command = normalize_command(command);
    Ok(form)
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/usecases - Use cases the caller can read
#[utoipa::path(
    get,
    path = "/api/v1/usecases",
    tag = "Use Cases",
    responses(
        (status = 200, description = "Readable use cases, newest first", body = Vec<UseCase>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_use_cases(
    State(state): State<Arc<UseCaseState>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<Vec<UseCase>>> {
    let records = state
        .service
        .list_visible(&auth.caller(), Permission::Read)
        .await?;

    Ok(Json(records.into_iter().map(UseCase::from).collect()))
}

/// GET /api/v1/usecases/list - Use cases the caller can edit, with owners
#[utoipa::path(
    get,
    path = "/api/v1/usecases/list",
    tag = "Use Cases",
    responses(
        (status = 200, description = "Writable use cases with owner profiles", body = Vec<UseCaseWithOwner>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_use_cases_with_owner(
    State(state): State<Arc<UseCaseState>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<Vec<UseCaseWithOwner>>> {
    let records = state
        .service
        .list_visible(&auth.caller(), Permission::Write)
        .await?;

    Ok(Json(records))
}

/// POST /api/v1/usecases/create - Create a use case owned by the caller
#[utoipa::path(
    post,
    path = "/api/v1/usecases/create",
    tag = "Use Cases",
    request_body = UseCaseForm,
    responses(
        (status = 200, description = "Use case created", body = UseCase),
        (status = 400, description = "Command taken or invalid request", body = ApiError),
        (status = 401, description = "Caller may not create use cases", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_use_case(
    State(state): State<Arc<UseCaseState>>,
    AuthExtractor(auth): AuthExtractor,
    Json(form): Json<UseCaseForm>,
) -> ApiResult<impl IntoResponse> {
    let caller = auth.caller();
    if !state
        .service
        .can_create(&caller, &state.user_permissions)
        .await
    {
        return Err(ApiError::unauthorized(
            "You do not have permission to create use cases",
        ));
    }

    let form = prepare_create_form(form)?;

    match state.service.get(&form.command).await {
        Ok(Some(_)) => return Err(ApiError::command_taken(&form.command)),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(command = %form.command, error = %e, "Lookup before create failed");
            return Err(ApiError::request_failed());
        }
    }

    let created = state
        .service
        .create(&caller.user_id, &form)
        .await
        .map_err(|e| match e {
            StoreError::Conflict { command } => ApiError::command_taken(command),
            other => {
                tracing::error!(command = %form.command, error = %other, "Create failed");
                ApiError::request_failed()
            }
        })?;

    Ok(Json(created))
}

/// GET /api/v1/usecases/command/{command} - Fetch one use case
#[utoipa::path(
    get,
    path = "/api/v1/usecases/command/{command}",
    tag = "Use Cases",
    params(
        ("command" = String, Path, description = "Command without the leading slash")
    ),
    responses(
        (status = 200, description = "Use case", body = UseCase),
        (status = 401, description = "Not found or access prohibited", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_use_case(
    State(state): State<Arc<UseCaseState>>,
    AuthExtractor(auth): AuthExtractor,
    Path(command): Path<String>,
) -> ApiResult<Json<UseCase>> {
    let command = normalize_command(&command);
    let use_case = state.require(&command).await?;

    if state.service.can_read(&auth.caller(), &use_case).await {
        Ok(Json(use_case))
    } else {
        tracing::debug!(command = %command, caller = %auth.user_id, "Read denied");
        Err(ApiError::access_prohibited())
    }
}

/// POST /api/v1/usecases/command/{command}/update - Replace a use case's body
#[utoipa::path(
    post,
    path = "/api/v1/usecases/command/{command}/update",
    tag = "Use Cases",
    params(
        ("command" = String, Path, description = "Command without the leading slash")
    ),
    request_body = UseCaseForm,
    responses(
        (status = 200, description = "Updated use case", body = UseCase),
        (status = 400, description = "Blank title", body = ApiError),
        (status = 401, description = "Not found, not the owner, or update failed", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_use_case(
    State(state): State<Arc<UseCaseState>>,
    AuthExtractor(auth): AuthExtractor,
    Path(command): Path<String>,
    Json(form): Json<UseCaseForm>,
) -> ApiResult<Json<UseCase>> {
    let command = normalize_command(&command);
    let use_case = state.require(&command).await?;

    if !state.service.is_owner_or_admin(&auth.caller(), &use_case) {
        return Err(ApiError::access_prohibited());
    }
    require_title(&form)?;

    let updated = state.service.update(&command, &form).await.map_err(|e| {
        tracing::warn!(command = %command, error = %e, "Update failed");
        ApiError::access_prohibited()
    })?;

    Ok(Json(updated))
}

/// DELETE /api/v1/usecases/command/{command}/delete - Remove a use case
#[utoipa::path(
    delete,
    path = "/api/v1/usecases/command/{command}/delete",
    tag = "Use Cases",
    params(
        ("command" = String, Path, description = "Command without the leading slash")
    ),
    responses(
        (status = 200, description = "Whether the delete statement succeeded", body = bool),
        (status = 401, description = "Not found or not the owner", body = ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_use_case(
    State(state): State<Arc<UseCaseState>>,
    AuthExtractor(auth): AuthExtractor,
    Path(command): Path<String>,
) -> ApiResult<Json<bool>> {
    let command = normalize_command(&command);
    let use_case = state.require(&command).await?;

    if !state.service.is_owner_or_admin(&auth.caller(), &use_case) {
        return Err(ApiError::access_prohibited());
    }

    let deleted = match state.service.delete(&command).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(command = %command, error = %e, "Delete failed");
            false
        }
    };

    Ok(Json(deleted))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the `/usecases` router. Mount it under `/api/v1`, behind
/// `auth_middleware`.
///
/// The listing answers at both `/usecases` and `/usecases/`.
pub fn create_router(service: UseCaseService, user_permissions: JsonValue) -> Router {
    let state = Arc::new(UseCaseState::new(service, user_permissions));

    let resource = Router::new()
        .route("/", get(list_use_cases))
        .route("/list", get(list_use_cases_with_owner))
        .route("/create", post(create_use_case))
        .route("/command/:command", get(get_use_case))
        .route("/command/:command/update", post(update_use_case))
        .route("/command/:command/delete", delete(delete_use_case));

    Router::new()
        .route("/usecases/", get(list_use_cases))
        .nest("/usecases", resource)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn form(command: &str, title: &str) -> UseCaseForm {
        UseCaseForm {
            command: command.to_string(),
            title: title.to_string(),
            content: "Say hello".to_string(),
            access_control: None,
        }
    }

    #[test]
    fn test_prepare_create_form_normalizes_command() -> ApiResult<()> {
        assert_eq!(prepare_create_form(form("greet", "Greet"))?.command, "/greet");
        assert_eq!(prepare_create_form(form(" /greet ", "Greet"))?.command, "/greet");
        Ok(())
    }

    #[test]
    fn test_prepare_create_form_rejects_blank_fields() {
        let err = prepare_create_form(form("/", "Greet")).err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::MissingField));

        let err = prepare_create_form(form("/greet", "   ")).err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::MissingField));
    }

    #[test]
    fn test_require_title() {
        assert!(require_title(&form("/greet", "Greet")).is_ok());
        let err = require_title(&form("/greet", "\t")).err();
        assert_eq!(err.map(|e| e.code), Some(ErrorCode::MissingField));
    }
}
