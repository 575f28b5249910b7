//! Use Case Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for forms and access control documents
//! - Fixtures for users, groups, and memory-backed services
//! - Assertions over store results

pub use usecase_core::{
    AccessControl, AccessRule, Caller, Group, GroupAccessPolicy, MemoryGroupDirectory,
    MemoryUseCaseStore, Role, StoreError, StoreResult, UseCase, UseCaseForm, UseCaseService,
    UserProfile,
};

use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for use case inputs.

    use super::*;
    use proptest::prelude::*;

    /// A command with its leading slash, e.g. `/summarize-2`.
    fn arb_command() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,15}".prop_map(|s| format!("/{}", s))
    }

    /// A short opaque user id.
    pub fn arb_user_id() -> impl Strategy<Value = String> {
        "u[0-9]{1,4}"
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::User), Just(Role::Pending)]
    }

    /// Rule listing a few user and group ids.
    pub fn arb_access_rule() -> impl Strategy<Value = AccessRule> {
        (
            prop::collection::vec(arb_user_id(), 0..4),
            prop::collection::vec("g[0-9]{1,2}", 0..3),
        )
            .prop_map(|(user_ids, group_ids)| AccessRule {
                group_ids,
                user_ids,
            })
    }

    /// Absent (public), empty (private), or with read/write rules.
    pub fn arb_access_control() -> impl Strategy<Value = Option<AccessControl>> {
        prop_oneof![
            Just(None),
            Just(Some(AccessControl::private())),
            (
                prop::option::of(arb_access_rule()),
                prop::option::of(arb_access_rule())
            )
                .prop_map(|(read, write)| Some(AccessControl { read, write })),
        ]
    }

    pub fn arb_use_case_form() -> impl Strategy<Value = UseCaseForm> {
        (
            arb_command(),
            "[A-Za-z][A-Za-z ]{0,23}",
            ".{0,200}",
            arb_access_control(),
        )
            .prop_map(|(command, title, content, access_control)| UseCaseForm {
                command,
                title,
                content,
                access_control,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use serde_json::json;

    /// A user id that will not collide with others in the same run.
    pub fn unique_user_id() -> String {
        format!("user-{}", uuid::Uuid::now_v7())
    }

    /// A command that will not collide with others in the same run.
    pub fn unique_command() -> String {
        format!("/test-{}", uuid::Uuid::now_v7().simple())
    }

    /// Publicly readable form.
    pub fn public_form(command: &str) -> UseCaseForm {
        UseCaseForm {
            command: command.to_string(),
            title: "Greeting".to_string(),
            content: "Say hello".to_string(),
            access_control: None,
        }
    }

    /// Owner-only form.
    pub fn private_form(command: &str) -> UseCaseForm {
        UseCaseForm {
            access_control: Some(AccessControl::private()),
            ..public_form(command)
        }
    }

    /// Form with explicit read and write user lists.
    pub fn shared_form(command: &str, readers: &[&str], writers: &[&str]) -> UseCaseForm {
        UseCaseForm {
            access_control: Some(
                AccessControl::private()
                    .with_read(AccessRule::users(readers.iter().copied()))
                    .with_write(AccessRule::users(writers.iter().copied())),
            ),
            ..public_form(command)
        }
    }

    pub fn profile(user_id: &str, role: Role) -> UserProfile {
        UserProfile {
            id: user_id.to_string(),
            name: format!("User {}", user_id),
            email: format!("{}@example.com", user_id),
            role: role.as_str().to_string(),
            profile_image_url: "/user.png".to_string(),
        }
    }

    /// Group whose members may create use cases.
    pub fn creators_group(id: &str, members: &[&str]) -> Group {
        Group {
            id: id.to_string(),
            name: format!("Group {}", id),
            user_ids: members.iter().map(|m| m.to_string()).collect(),
            permissions: json!({ "workspace": { "use_cases": true } }),
        }
    }

    /// Plain group with no feature permissions.
    pub fn group(id: &str, members: &[&str]) -> Group {
        Group {
            permissions: json!({}),
            ..creators_group(id, members)
        }
    }

    /// Memory-backed service plus handles to its store and directory.
    pub struct MemoryFixture {
        pub store: Arc<MemoryUseCaseStore>,
        pub groups: Arc<MemoryGroupDirectory>,
        pub service: UseCaseService,
    }

    pub fn memory_fixture(store: MemoryUseCaseStore, groups: Vec<Group>) -> MemoryFixture {
        let store = Arc::new(store);
        let groups = Arc::new(MemoryGroupDirectory::new(groups));
        let service = UseCaseService::new(
            store.clone(),
            Arc::new(GroupAccessPolicy::new(groups.clone())),
        );
        MemoryFixture {
            store,
            groups,
            service,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over store results.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &StoreResult<T>, command: &str) {
        match result {
            Err(StoreError::NotFound { command: c }) => assert_eq!(c, command),
            other => panic!("Expected NotFound for {}, got: {:?}", command, other),
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &StoreResult<T>, command: &str) {
        match result {
            Err(StoreError::Conflict { command: c }) => assert_eq!(c, command),
            other => panic!("Expected Conflict for {}, got: {:?}", command, other),
        }
    }

    /// Commands in list order.
    pub fn commands<'a>(records: impl IntoIterator<Item = &'a UseCase>) -> Vec<&'a str> {
        records.into_iter().map(|r| r.command.as_str()).collect()
    }
}

pub use assertions::*;
pub use fixtures::*;
pub use generators::*;
