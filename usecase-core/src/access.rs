//! Access control rules and permission evaluation
//!
//! A record's `access_control` has three states:
//! - `None`: public, any verified user may read
//! - `Some` with no rules (`{}`): private, only the owner
//! - `Some` with rules: explicit user/group allow-lists per permission
//!
//! Owner and admin bypasses are applied by the caller, never here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::entities::Group;
use crate::error::StoreResult;

/// Permission a caller needs on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            other => Err(format!("unknown permission: {}", other)),
        }
    }
}

/// Allow-list for a single permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessRule {
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

impl AccessRule {
    pub fn users<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_ids: Vec::new(),
            user_ids: user_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn groups<I, S>(group_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_ids: group_ids.into_iter().map(Into::into).collect(),
            user_ids: Vec::new(),
        }
    }

    fn admits<'a>(&self, user_id: &str, mut group_ids: impl Iterator<Item = &'a str>) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
            || group_ids.any(|gid| self.group_ids.iter().any(|allowed| allowed == gid))
    }
}

/// Per-record read/write allow-lists.
///
/// The default value has no rules and serializes as `{}`, which makes a
/// record private to its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<AccessRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<AccessRule>,
}

impl AccessControl {
    /// Owner-only access.
    pub fn private() -> Self {
        Self::default()
    }

    pub fn with_read(mut self, rule: AccessRule) -> Self {
        self.read = Some(rule);
        self
    }

    pub fn with_write(mut self, rule: AccessRule) -> Self {
        self.write = Some(rule);
        self
    }

    pub fn rule(&self, permission: Permission) -> Option<&AccessRule> {
        match permission {
            Permission::Read => self.read.as_ref(),
            Permission::Write => self.write.as_ref(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.read.is_none() && self.write.is_none()
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// A user together with the groups they belong to.
///
/// Resolving groups is the expensive part of a policy check, so list
/// filtering resolves a subject once and evaluates every record against it.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessSubject {
    pub user_id: String,
    pub groups: Vec<Group>,
}

impl AccessSubject {
    pub fn new(user_id: impl Into<String>, groups: Vec<Group>) -> Self {
        Self {
            user_id: user_id.into(),
            groups,
        }
    }

    /// A subject without any group memberships.
    pub fn ungrouped(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Vec::new())
    }

    /// Whether the record's rules grant `permission` to this subject.
    pub fn has_access(&self, permission: Permission, access_control: Option<&AccessControl>) -> bool {
        match access_control {
            None => permission == Permission::Read,
            Some(rules) => rules.rule(permission).is_some_and(|rule| {
                rule.admits(&self.user_id, self.groups.iter().map(|g| g.id.as_str()))
            }),
        }
    }

    /// Whether a workspace feature flag is granted.
    ///
    /// Any group holding a truthy value at `permission_key` grants it;
    /// otherwise the default permissions decide.
    pub fn has_permission(&self, permission_key: &str, default_permissions: &JsonValue) -> bool {
        self.groups
            .iter()
            .any(|group| permission_at(&group.permissions, permission_key))
            || permission_at(default_permissions, permission_key)
    }
}

/// Look up a dot-separated key and report whether its value is truthy.
pub fn permission_at(permissions: &JsonValue, permission_key: &str) -> bool {
    let mut current = permissions;
    for key in permission_key.split('.') {
        match current.get(key) {
            Some(next) => current = next,
            None => return false,
        }
    }
    is_truthy(current)
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

// ============================================================================
// POLICY SEAM
// ============================================================================

/// Resolves a user's group memberships.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn groups_for_member(&self, user_id: &str) -> StoreResult<Vec<Group>>;
}

/// Decides whether a user may act on a record or use a workspace feature.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Resolve the subject used for evaluation.
    async fn subject(&self, user_id: &str) -> AccessSubject;

    async fn has_access(
        &self,
        user_id: &str,
        permission: Permission,
        access_control: Option<&AccessControl>,
    ) -> bool {
        self.subject(user_id)
            .await
            .has_access(permission, access_control)
    }

    async fn has_permission(
        &self,
        user_id: &str,
        permission_key: &str,
        default_permissions: &JsonValue,
    ) -> bool {
        self.subject(user_id)
            .await
            .has_permission(permission_key, default_permissions)
    }
}

/// Access policy backed by a [`GroupDirectory`].
#[derive(Clone)]
pub struct GroupAccessPolicy {
    groups: Arc<dyn GroupDirectory>,
}

impl GroupAccessPolicy {
    pub fn new(groups: Arc<dyn GroupDirectory>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl AccessPolicy for GroupAccessPolicy {
    async fn subject(&self, user_id: &str) -> AccessSubject {
        match self.groups.groups_for_member(user_id).await {
            Ok(groups) => AccessSubject::new(user_id, groups),
            Err(err) => {
                // Fail closed: without groups only direct grants apply.
                tracing::warn!(user_id, error = %err, "Group lookup failed");
                AccessSubject::ungrouped(user_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;

    fn group(id: &str, members: &[&str], permissions: JsonValue) -> Group {
        Group {
            id: id.to_string(),
            name: id.to_uppercase(),
            user_ids: members.iter().map(|m| m.to_string()).collect(),
            permissions,
        }
    }

    #[test]
    fn test_public_grants_read_only() {
        let subject = AccessSubject::ungrouped("u2");
        assert!(subject.has_access(Permission::Read, None));
        assert!(!subject.has_access(Permission::Write, None));
    }

    #[test]
    fn test_private_grants_nobody() {
        let subject = AccessSubject::ungrouped("u2");
        let private = AccessControl::private();
        assert!(private.is_private());
        assert!(!subject.has_access(Permission::Read, Some(&private)));
        assert!(!subject.has_access(Permission::Write, Some(&private)));
    }

    #[test]
    fn test_user_allow_list() {
        let ac = AccessControl::private()
            .with_read(AccessRule::users(["u2", "u3"]))
            .with_write(AccessRule::users(["u3"]));

        let u2 = AccessSubject::ungrouped("u2");
        assert!(u2.has_access(Permission::Read, Some(&ac)));
        assert!(!u2.has_access(Permission::Write, Some(&ac)));

        let u3 = AccessSubject::ungrouped("u3");
        assert!(u3.has_access(Permission::Write, Some(&ac)));
    }

    #[test]
    fn test_group_allow_list() {
        let ac = AccessControl::private().with_write(AccessRule::groups(["editors"]));
        let member = AccessSubject::new("u4", vec![group("editors", &["u4"], json!({}))]);
        let outsider = AccessSubject::new("u5", vec![group("viewers", &["u5"], json!({}))]);

        assert!(member.has_access(Permission::Write, Some(&ac)));
        assert!(!member.has_access(Permission::Read, Some(&ac)));
        assert!(!outsider.has_access(Permission::Write, Some(&ac)));
    }

    #[test]
    fn test_access_control_wire_shapes() -> Result<(), serde_json::Error> {
        let empty: AccessControl = serde_json::from_value(json!({}))?;
        assert!(empty.is_private());
        assert_eq!(serde_json::to_value(&empty)?, json!({}));

        let partial: AccessControl = serde_json::from_value(json!({
            "read": {"user_ids": ["u1"]}
        }))?;
        assert_eq!(partial.read, Some(AccessRule::users(["u1"])));
        assert!(partial.write.is_none());
        Ok(())
    }

    #[test]
    fn test_permission_lookup() {
        let perms = json!({"workspace": {"use_cases": true, "models": false}});
        assert!(permission_at(&perms, "workspace.use_cases"));
        assert!(!permission_at(&perms, "workspace.models"));
        assert!(!permission_at(&perms, "workspace.tools"));
        assert!(!permission_at(&perms, "chat.delete"));
        assert!(permission_at(&perms, "workspace"));
    }

    #[test]
    fn test_has_permission_group_overrides_default() {
        let defaults = json!({"workspace": {"use_cases": false}});
        let granted = AccessSubject::new(
            "u1",
            vec![group("g", &["u1"], json!({"workspace": {"use_cases": true}}))],
        );
        let plain = AccessSubject::ungrouped("u2");

        assert!(granted.has_permission("workspace.use_cases", &defaults));
        assert!(!plain.has_permission("workspace.use_cases", &defaults));
        assert!(plain.has_permission("workspace.use_cases", &json!({"workspace": {"use_cases": true}})));
    }

    struct FailingDirectory;

    #[async_trait]
    impl GroupDirectory for FailingDirectory {
        async fn groups_for_member(&self, _user_id: &str) -> StoreResult<Vec<Group>> {
            Err(StoreError::persistence("groups_for_member", "offline"))
        }
    }

    #[tokio::test]
    async fn test_group_lookup_failure_fails_closed() {
        let policy = GroupAccessPolicy::new(Arc::new(FailingDirectory));
        let ac = AccessControl::private().with_read(AccessRule::groups(["g"]));

        assert!(!policy.has_access("u1", Permission::Read, Some(&ac)).await);
        assert!(policy.has_access("u1", Permission::Read, None).await);
        assert!(
            !policy
                .has_permission("u1", "workspace.use_cases", &json!({}))
                .await
        );
    }
}
