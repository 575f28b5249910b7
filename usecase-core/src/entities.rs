//! Use case entities and request forms

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::access::AccessControl;
use crate::EpochSeconds;

/// A named command template owned by a user.
///
/// `command` is the primary key and never changes after creation. `user_id`
/// is the owner and is set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UseCase {
    /// Unique command string, conventionally prefixed with `/`
    pub command: String,
    /// Owner of the record
    pub user_id: String,
    /// Display name
    pub title: String,
    /// Template body
    pub content: String,
    /// Epoch seconds of the most recent write
    pub timestamp: EpochSeconds,
    /// Read/write allow-lists; `null` means public read
    pub access_control: Option<AccessControl>,
}

impl UseCase {
    /// Whether `user_id` owns this record.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Public profile of a use case owner, as exposed in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub profile_image_url: String,
}

/// A use case joined with its owner's profile.
///
/// `user` is `None` when the owner no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UseCaseWithOwner {
    #[serde(flatten)]
    pub use_case: UseCase,
    pub user: Option<UserProfile>,
}

impl UseCaseWithOwner {
    pub fn new(use_case: UseCase, user: Option<UserProfile>) -> Self {
        Self { use_case, user }
    }
}

impl From<UseCaseWithOwner> for UseCase {
    fn from(value: UseCaseWithOwner) -> Self {
        value.use_case
    }
}

/// Request body for creating or updating a use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UseCaseForm {
    /// Command string; ignored on update
    pub command: String,
    pub title: String,
    pub content: String,
    /// Omitted or `null` makes the record publicly readable
    #[serde(default)]
    pub access_control: Option<AccessControl>,
}

/// A user-level group with members and feature permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    /// Nested object of boolean feature flags, e.g. `{"workspace": {"use_cases": true}}`
    #[serde(default)]
    pub permissions: serde_json::Value,
}

impl Group {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
    }
}

// ============================================================================
// CALLER IDENTITY
// ============================================================================

/// Account role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    /// Signed up but not yet approved; cannot use the API
    #[default]
    Pending,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Pending => "pending",
        }
    }

    /// Verified accounts are regular users and admins.
    pub fn is_verified(&self) -> bool {
        matches!(self, Role::Admin | Role::User)
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    /// Unknown roles are treated as pending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            "user" => Role::User,
            _ => Role::Pending,
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ============================================================================
// COMMAND NORMALIZATION
// ============================================================================

/// Prefix a command with `/` unless it already has one.
///
/// Path segments arrive without the slash; stored commands carry it.
pub fn normalize_command(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_command() {
        assert_eq!(normalize_command("greet"), "/greet");
        assert_eq!(normalize_command("/greet"), "/greet");
        assert_eq!(normalize_command(""), "/");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("USER".parse::<Role>(), Ok(Role::User));
        assert_eq!("pending".parse::<Role>(), Ok(Role::Pending));
        assert_eq!("banned".parse::<Role>(), Ok(Role::Pending));
        assert!(Role::Admin.is_verified());
        assert!(!Role::Pending.is_verified());
    }

    #[test]
    fn test_form_without_access_control_is_public() -> Result<(), serde_json::Error> {
        let form: UseCaseForm = serde_json::from_str(
            r#"{"command": "/greet", "title": "Greet", "content": "Say hello"}"#,
        )?;
        assert!(form.access_control.is_none());
        Ok(())
    }

    #[test]
    fn test_with_owner_flattens_use_case() -> Result<(), serde_json::Error> {
        let view = UseCaseWithOwner::new(
            UseCase {
                command: "/greet".to_string(),
                user_id: "u1".to_string(),
                title: "Greet".to_string(),
                content: "Say hello".to_string(),
                timestamp: 1_700_000_000,
                access_control: Some(AccessControl::default()),
            },
            None,
        );
        let json = serde_json::to_value(&view)?;
        assert_eq!(json["command"], "/greet");
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["access_control"], serde_json::json!({}));
        assert!(json["user"].is_null());

        let back: UseCaseWithOwner = serde_json::from_value(json)?;
        assert_eq!(back, view);
        Ok(())
    }

    #[test]
    fn test_group_membership() {
        let group = Group {
            id: "g1".to_string(),
            name: "Editors".to_string(),
            user_ids: vec!["u1".to_string(), "u2".to_string()],
            permissions: serde_json::json!({}),
        };
        assert!(group.has_member("u2"));
        assert!(!group.has_member("u3"));
    }
}
