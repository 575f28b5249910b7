//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling with deadpool-postgres, plus the Postgres
//! implementations of the core store and group directory seams.
//!
//! Every store call checks out its own pooled connection and runs a single
//! statement. The `command` primary key is what rejects duplicate inserts.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use usecase_core::{
    AccessControl, Clock, Group, GroupDirectory, StoreError, StoreResult, SystemClock, UseCase,
    UseCaseForm, UseCaseStore, UseCaseWithOwner, UserProfile,
};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "usecases".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("USECASE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("USECASE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("USECASE_DB_NAME").unwrap_or_else(|_| "usecases".to_string()),
            user: std::env::var("USECASE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("USECASE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("USECASE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("USECASE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(self.max_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Table owned by this service. External "user" and "group" tables are
/// read but never created here.
pub const USE_CASE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS use_case (
    command        TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    title          TEXT NOT NULL,
    content        TEXT NOT NULL,
    "timestamp"    BIGINT NOT NULL,
    access_control JSONB NULL
)
"#;

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    pub async fn get_conn(&self) -> ApiResult<Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Create the `use_case` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(USE_CASE_DDL).await?;
        tracing::info!("use_case table ready");
        Ok(())
    }

    async fn store_conn(&self, operation: &str) -> StoreResult<Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!(operation, error = ?e, "Failed to acquire database connection");
            StoreError::persistence(operation, e)
        })
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn persistence_error(operation: &str, err: tokio_postgres::Error) -> StoreError {
    tracing::error!(operation, error = ?err, "Database error");
    StoreError::persistence(operation, err)
}

fn access_control_param(form: &UseCaseForm) -> StoreResult<Option<JsonValue>> {
    form.access_control
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::persistence("encode access_control", e))
}

fn use_case_from_row(row: &Row) -> StoreResult<UseCase> {
    let command: String = row
        .try_get("command")
        .map_err(|e| persistence_error("read command", e))?;

    let read = |e: tokio_postgres::Error| StoreError::Corrupt {
        command: command.clone(),
        reason: e.to_string(),
    };

    let access_control: Option<JsonValue> = row.try_get("access_control").map_err(read)?;
    let access_control = access_control
        .filter(|value| !value.is_null())
        .map(serde_json::from_value::<AccessControl>)
        .transpose()
        .map_err(|e| StoreError::Corrupt {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    Ok(UseCase {
        user_id: row.try_get("user_id").map_err(read)?,
        title: row.try_get("title").map_err(read)?,
        content: row.try_get("content").map_err(read)?,
        timestamp: row.try_get("timestamp").map_err(read)?,
        access_control,
        command,
    })
}

/// Owner profile from the LEFT JOIN columns; `None` when the owner is gone.
fn owner_from_row(row: &Row) -> Option<UserProfile> {
    let id: Option<String> = row.try_get("owner_id").ok().flatten();
    id.map(|id| UserProfile {
        id,
        name: row.try_get::<_, Option<String>>("owner_name").ok().flatten().unwrap_or_default(),
        email: row.try_get::<_, Option<String>>("owner_email").ok().flatten().unwrap_or_default(),
        role: row.try_get::<_, Option<String>>("owner_role").ok().flatten().unwrap_or_default(),
        profile_image_url: row
            .try_get::<_, Option<String>>("owner_profile_image_url")
            .ok()
            .flatten()
            .unwrap_or_default(),
    })
}

const USE_CASE_COLUMNS: &str =
    r#"command, user_id, title, content, "timestamp", access_control"#;

// ============================================================================
// POSTGRES USE CASE STORE
// ============================================================================

/// `UseCaseStore` backed by the `use_case` table.
#[derive(Clone)]
pub struct PgUseCaseStore {
    db: DbClient,
    clock: Arc<dyn Clock>,
}

impl PgUseCaseStore {
    pub fn new(db: DbClient) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: DbClient, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl UseCaseStore for PgUseCaseStore {
    async fn create(&self, owner_id: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        let conn = self.db.store_conn("create").await?;
        let access_control = access_control_param(form)?;
        let timestamp = self.clock.now_epoch_secs();

        let sql = format!(
            r#"INSERT INTO use_case ({USE_CASE_COLUMNS})
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {USE_CASE_COLUMNS}"#
        );
        let row = conn
            .query_one(
                &sql,
                &[
                    &form.command,
                    &owner_id,
                    &form.title,
                    &form.content,
                    &timestamp,
                    &access_control,
                ],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    StoreError::conflict(&form.command)
                } else {
                    persistence_error("create", e)
                }
            })?;

        use_case_from_row(&row)
    }

    async fn get_by_command(&self, command: &str) -> StoreResult<Option<UseCase>> {
        let conn = self.db.store_conn("get_by_command").await?;
        let sql = format!("SELECT {USE_CASE_COLUMNS} FROM use_case WHERE command = $1");

        let row = conn
            .query_opt(&sql, &[&command])
            .await
            .map_err(|e| persistence_error("get_by_command", e))?;

        row.as_ref().map(use_case_from_row).transpose()
    }

    async fn list_all(&self) -> StoreResult<Vec<UseCaseWithOwner>> {
        let conn = self.db.store_conn("list_all").await?;

        let rows = conn
            .query(
                r#"SELECT uc.command, uc.user_id, uc.title, uc.content, uc."timestamp",
                          uc.access_control,
                          u.id AS owner_id, u.name AS owner_name, u.email AS owner_email,
                          u.role AS owner_role,
                          u.profile_image_url AS owner_profile_image_url
                   FROM use_case uc
                   LEFT JOIN "user" u ON u.id = uc.user_id
                   ORDER BY uc."timestamp" DESC"#,
                &[],
            )
            .await
            .map_err(|e| persistence_error("list_all", e))?;

        rows.iter()
            .map(|row| -> StoreResult<UseCaseWithOwner> {
                Ok(UseCaseWithOwner::new(use_case_from_row(row)?, owner_from_row(row)))
            })
            .collect()
    }

    async fn update(&self, command: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        let conn = self.db.store_conn("update").await?;
        let access_control = access_control_param(form)?;
        let now = self.clock.now_epoch_secs();

        // Same-second writes still advance the stamp.
        let sql = format!(
            r#"UPDATE use_case
               SET title = $2, content = $3, access_control = $4,
                   "timestamp" = GREATEST($5, "timestamp" + 1)
               WHERE command = $1
               RETURNING {USE_CASE_COLUMNS}"#
        );
        let row = conn
            .query_opt(
                &sql,
                &[&command, &form.title, &form.content, &access_control, &now],
            )
            .await
            .map_err(|e| persistence_error("update", e))?
            .ok_or_else(|| StoreError::not_found(command))?;

        use_case_from_row(&row)
    }

    async fn delete(&self, command: &str) -> StoreResult<()> {
        let conn = self.db.store_conn("delete").await?;
        let removed = conn
            .execute("DELETE FROM use_case WHERE command = $1", &[&command])
            .await
            .map_err(|e| persistence_error("delete", e))?;

        tracing::debug!(command, removed, "Delete statement executed");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let conn = self.db.store_conn("ping").await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(|e| persistence_error("ping", e))?;
        Ok(())
    }
}

// ============================================================================
// POSTGRES GROUP DIRECTORY
// ============================================================================

/// Reads group membership from the external "group" table.
#[derive(Clone)]
pub struct PgGroupDirectory {
    db: DbClient,
}

impl PgGroupDirectory {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

fn string_list(value: Option<JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl GroupDirectory for PgGroupDirectory {
    async fn groups_for_member(&self, user_id: &str) -> StoreResult<Vec<Group>> {
        let conn = self.db.store_conn("groups_for_member").await?;

        let rows = conn
            .query(
                r#"SELECT id, name, user_ids, permissions
                   FROM "group"
                   WHERE user_ids @> jsonb_build_array($1::text)"#,
                &[&user_id],
            )
            .await
            .map_err(|e| persistence_error("groups_for_member", e))?;

        rows.iter()
            .map(|row| -> StoreResult<Group> {
                let id: String = row
                    .try_get("id")
                    .map_err(|e| persistence_error("read group", e))?;
                let name: Option<String> = row
                    .try_get("name")
                    .map_err(|e| persistence_error("read group", e))?;
                let user_ids: Option<JsonValue> = row
                    .try_get("user_ids")
                    .map_err(|e| persistence_error("read group", e))?;
                let permissions: Option<JsonValue> = row
                    .try_get("permissions")
                    .map_err(|e| persistence_error("read group", e))?;

                Ok(Group {
                    id,
                    name: name.unwrap_or_default(),
                    user_ids: string_list(user_ids),
                    permissions: permissions.unwrap_or(JsonValue::Null),
                })
            })
            .collect()
    }
}
