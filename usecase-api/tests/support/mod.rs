//! Shared harness for HTTP-level tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use usecase_api::{create_api_router, generate_jwt_token, ApiConfig, AuthConfig, JwtSecret};
use usecase_core::{
    FixedClock, Group, GroupAccessPolicy, ManualClock, MemoryUseCaseStore, Role, StoreError,
    StoreResult, UseCase, UseCaseForm, UseCaseService, UseCaseStore, UseCaseWithOwner,
};
use usecase_test_utils::{memory_fixture, MemoryFixture};

/// 2024-01-01T00:00:00Z
pub const NOW: i64 = 1_704_067_200;

const TEST_SECRET: &str = "integration_test_secret_that_is_long_enough";

pub fn test_auth_config() -> Result<AuthConfig, String> {
    let secret = JwtSecret::new(TEST_SECRET.to_string()).map_err(|e| e.to_string())?;
    Ok(AuthConfig::default()
        .with_secret(secret)
        .with_clock(Arc::new(FixedClock(NOW))))
}

/// Router over a memory store whose clock the test controls.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub fixture: MemoryFixture,
    auth: AuthConfig,
}

pub type Reply = (StatusCode, JsonValue);

impl TestApp {
    pub fn new(groups: Vec<Group>) -> Result<Self, String> {
        Self::with_config(groups, ApiConfig::default())
    }

    pub fn with_config(groups: Vec<Group>, api_config: ApiConfig) -> Result<Self, String> {
        let clock = Arc::new(ManualClock::new(NOW));
        let fixture = memory_fixture(MemoryUseCaseStore::with_clock(clock.clone()), groups);
        let service = fixture.service.clone();
        Self::assemble(clock, fixture, service, &api_config)
    }

    /// Router whose store fails the operations named in `faults`.
    ///
    /// `fixture.store` still reaches the healthy store underneath, so tests
    /// can seed records the router then fails to touch.
    pub fn with_faults(groups: Vec<Group>, faults: Faults) -> Result<Self, String> {
        let clock = Arc::new(ManualClock::new(NOW));
        let fixture = memory_fixture(MemoryUseCaseStore::with_clock(clock.clone()), groups);
        let store = FaultyStore {
            inner: fixture.store.clone(),
            faults,
        };
        let service = UseCaseService::new(
            Arc::new(store),
            Arc::new(GroupAccessPolicy::new(fixture.groups.clone())),
        );
        Self::assemble(clock, fixture, service, &ApiConfig::default())
    }

    fn assemble(
        clock: Arc<ManualClock>,
        fixture: MemoryFixture,
        service: UseCaseService,
        api_config: &ApiConfig,
    ) -> Result<Self, String> {
        let auth = test_auth_config()?;
        let router =
            create_api_router(service, api_config, auth.clone()).map_err(|e| e.to_string())?;

        Ok(Self {
            router,
            clock,
            fixture,
            auth,
        })
    }

    pub fn token(&self, user_id: &str, role: Role) -> Result<String, String> {
        generate_jwt_token(&self.auth, user_id.to_string(), role).map_err(|e| e.to_string())
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> Result<Reply, String> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .map_err(|e| e.to_string())?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| format!("Request failed: {:?}", e))?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;

        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| e.to_string())?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<Reply, String> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: JsonValue) -> Result<Reply, String> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<Reply, String> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }
}

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Store operations that should fail.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Error returned by `create` instead of inserting.
    pub create: Option<StoreError>,
    pub get: bool,
    pub list: bool,
    pub update: bool,
    pub delete: bool,
}

/// Memory store wrapper that fails selected operations.
struct FaultyStore {
    inner: Arc<MemoryUseCaseStore>,
    faults: Faults,
}

fn injected(operation: &str) -> StoreError {
    StoreError::persistence(operation, "injected fault")
}

#[async_trait]
impl UseCaseStore for FaultyStore {
    async fn create(&self, owner_id: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        match &self.faults.create {
            Some(err) => Err(err.clone()),
            None => self.inner.create(owner_id, form).await,
        }
    }

    async fn get_by_command(&self, command: &str) -> StoreResult<Option<UseCase>> {
        if self.faults.get {
            return Err(injected("get_by_command"));
        }
        self.inner.get_by_command(command).await
    }

    async fn list_all(&self) -> StoreResult<Vec<UseCaseWithOwner>> {
        if self.faults.list {
            return Err(injected("list_all"));
        }
        self.inner.list_all().await
    }

    async fn update(&self, command: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        if self.faults.update {
            return Err(injected("update"));
        }
        self.inner.update(command, form).await
    }

    async fn delete(&self, command: &str) -> StoreResult<()> {
        if self.faults.delete {
            return Err(injected("delete"));
        }
        self.inner.delete(command).await
    }
}

/// Commands from a JSON array of use cases, in response order.
pub fn commands(body: &JsonValue) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["command"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
