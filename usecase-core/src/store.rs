//! Record store contract and time sources

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::entities::{UseCase, UseCaseForm, UseCaseWithOwner};
use crate::error::StoreResult;
use crate::EpochSeconds;

/// Persistence for use case records.
///
/// Each call is its own unit of work. There is no transaction spanning
/// calls; the primary key on `command` is what rejects duplicate inserts.
#[async_trait]
pub trait UseCaseStore: Send + Sync {
    /// Insert a new record owned by `owner_id`, stamped with the current time.
    ///
    /// Returns `StoreError::Conflict` when the command already exists.
    async fn create(&self, owner_id: &str, form: &UseCaseForm) -> StoreResult<UseCase>;

    async fn get_by_command(&self, command: &str) -> StoreResult<Option<UseCase>>;

    /// Every record, newest first, joined with its owner's profile.
    async fn list_all(&self) -> StoreResult<Vec<UseCaseWithOwner>>;

    /// Overwrite title, content and access control and re-stamp the record.
    ///
    /// Returns `StoreError::NotFound` when the command does not exist.
    async fn update(&self, command: &str, form: &UseCaseForm) -> StoreResult<UseCase>;

    /// Remove the record. Removing an absent command succeeds.
    async fn delete(&self, command: &str) -> StoreResult<()>;

    /// Readiness check for health endpoints.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

// ============================================================================
// CLOCKS
// ============================================================================

/// Source of epoch-second timestamps for record writes.
pub trait Clock: Send + Sync {
    fn now_epoch_secs(&self) -> EpochSeconds;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> EpochSeconds {
        chrono::Utc::now().timestamp()
    }
}

/// Always returns the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub EpochSeconds);

impl Clock for FixedClock {
    fn now_epoch_secs(&self) -> EpochSeconds {
        self.0
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: EpochSeconds) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn advance(&self, secs: EpochSeconds) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, now: EpochSeconds) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_secs(&self) -> EpochSeconds {
        self.0.load(Ordering::SeqCst)
    }
}

/// Timestamp for a rewrite of a record last stamped at `previous`.
///
/// Never goes backwards and never repeats, so two writes inside the same
/// second still produce strictly increasing timestamps.
pub fn next_timestamp(previous: EpochSeconds, now: EpochSeconds) -> EpochSeconds {
    now.max(previous.saturating_add(1))
}
