//! Resource service: ownership stamping and permission-filtered listing

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::access::{AccessPolicy, Permission};
use crate::entities::{Caller, UseCase, UseCaseForm, UseCaseWithOwner};
use crate::error::StoreResult;
use crate::store::UseCaseStore;

/// Workspace permission key that lets non-admins create use cases.
pub const CREATE_PERMISSION_KEY: &str = "workspace.use_cases";

/// Use case operations shared by every transport.
#[derive(Clone)]
pub struct UseCaseService {
    store: Arc<dyn UseCaseStore>,
    policy: Arc<dyn AccessPolicy>,
}

impl UseCaseService {
    pub fn new(store: Arc<dyn UseCaseStore>, policy: Arc<dyn AccessPolicy>) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn UseCaseStore> {
        &self.store
    }

    pub fn policy(&self) -> &Arc<dyn AccessPolicy> {
        &self.policy
    }

    /// Every record, unfiltered.
    pub async fn list_all(&self) -> StoreResult<Vec<UseCaseWithOwner>> {
        self.store.list_all().await
    }

    /// Records the caller owns or holds `permission` on, newest first.
    pub async fn list_for_user(
        &self,
        caller_id: &str,
        permission: Permission,
    ) -> StoreResult<Vec<UseCaseWithOwner>> {
        let records = self.store.list_all().await?;
        let subject = self.policy.subject(caller_id).await;
        let total = records.len();

        let visible: Vec<UseCaseWithOwner> = records
            .into_iter()
            .filter(|r| {
                r.use_case.is_owned_by(caller_id)
                    || subject.has_access(permission, r.use_case.access_control.as_ref())
            })
            .collect();

        tracing::debug!(
            caller_id,
            %permission,
            total,
            visible = visible.len(),
            "Filtered use case list"
        );
        Ok(visible)
    }

    /// Admins see everything; everyone else gets the filtered view.
    pub async fn list_visible(
        &self,
        caller: &Caller,
        permission: Permission,
    ) -> StoreResult<Vec<UseCaseWithOwner>> {
        if caller.is_admin() {
            self.list_all().await
        } else {
            self.list_for_user(&caller.user_id, permission).await
        }
    }

    pub async fn get(&self, command: &str) -> StoreResult<Option<UseCase>> {
        self.store.get_by_command(command).await
    }

    /// Create a record owned by `owner_id`.
    pub async fn create(&self, owner_id: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        let created = self.store.create(owner_id, form).await?;
        tracing::info!(command = %created.command, owner_id, "Use case created");
        Ok(created)
    }

    pub async fn update(&self, command: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        let updated = self.store.update(command, form).await?;
        tracing::info!(command, timestamp = updated.timestamp, "Use case updated");
        Ok(updated)
    }

    pub async fn delete(&self, command: &str) -> StoreResult<()> {
        self.store.delete(command).await?;
        tracing::info!(command, "Use case deleted");
        Ok(())
    }

    // ========================================================================
    // AUTHORIZATION PREDICATES
    // ========================================================================

    /// Admin, owner, or read-granted.
    pub async fn can_read(&self, caller: &Caller, use_case: &UseCase) -> bool {
        caller.is_admin()
            || use_case.is_owned_by(&caller.user_id)
            || self
                .policy
                .has_access(
                    &caller.user_id,
                    Permission::Read,
                    use_case.access_control.as_ref(),
                )
                .await
    }

    /// Only owners and admins may modify or delete a record.
    pub fn is_owner_or_admin(&self, caller: &Caller, use_case: &UseCase) -> bool {
        caller.is_admin() || use_case.is_owned_by(&caller.user_id)
    }

    /// Admin, or granted the workspace use case permission.
    pub async fn can_create(&self, caller: &Caller, default_permissions: &JsonValue) -> bool {
        caller.is_admin()
            || self
                .policy
                .has_permission(&caller.user_id, CREATE_PERMISSION_KEY, default_permissions)
                .await
    }
}
