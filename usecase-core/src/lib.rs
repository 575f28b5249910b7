//! Use case core
//!
//! Domain types and contracts for use cases: named command templates owned
//! by users, each carrying read/write access-control rules.
//!
//! - [`UseCaseStore`] is the persistence seam, with an in-memory
//!   implementation in [`memory`]
//! - [`AccessPolicy`] decides record access and workspace permissions
//! - [`UseCaseService`] ties the two together for the transport layer

pub mod access;
pub mod entities;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;

/// Seconds since the Unix epoch.
pub type EpochSeconds = i64;

pub use access::{
    permission_at, AccessControl, AccessPolicy, AccessRule, AccessSubject, GroupAccessPolicy,
    GroupDirectory, Permission,
};
pub use entities::{
    normalize_command, Caller, Group, Role, UseCase, UseCaseForm, UseCaseWithOwner, UserProfile,
};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryGroupDirectory, MemoryUseCaseStore};
pub use service::{UseCaseService, CREATE_PERMISSION_KEY};
pub use store::{next_timestamp, Clock, FixedClock, ManualClock, SystemClock, UseCaseStore};
