//! In-memory store and group directory
//!
//! Used by the dev server and by tests. Semantics match the Postgres store:
//! duplicate commands conflict, lists are newest first with insertion order
//! breaking ties, and deleting an absent command succeeds.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::access::GroupDirectory;
use crate::entities::{Group, UseCase, UseCaseForm, UseCaseWithOwner, UserProfile};
use crate::error::{StoreError, StoreResult};
use crate::store::{next_timestamp, Clock, SystemClock, UseCaseStore};

#[derive(Debug, Clone)]
struct StoredUseCase {
    seq: u64,
    use_case: UseCase,
}

#[derive(Debug, Default)]
struct Tables {
    next_seq: u64,
    use_cases: HashMap<String, StoredUseCase>,
    users: HashMap<String, UserProfile>,
}

/// Use case store held in process memory.
#[derive(Clone)]
pub struct MemoryUseCaseStore {
    tables: Arc<RwLock<Tables>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryUseCaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUseCaseStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            clock,
        }
    }

    /// Register a user profile so list results can resolve owners.
    pub fn add_user(&self, profile: UserProfile) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.users.insert(profile.id.clone(), profile);
        Ok(())
    }

    pub fn remove_user(&self, user_id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.users.remove(user_id);
        Ok(())
    }

    pub fn len(&self) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.use_cases.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl UseCaseStore for MemoryUseCaseStore {
    async fn create(&self, owner_id: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.use_cases.contains_key(&form.command) {
            return Err(StoreError::conflict(&form.command));
        }

        let use_case = UseCase {
            command: form.command.clone(),
            user_id: owner_id.to_string(),
            title: form.title.clone(),
            content: form.content.clone(),
            timestamp: self.clock.now_epoch_secs(),
            access_control: form.access_control.clone(),
        };

        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.use_cases.insert(
            use_case.command.clone(),
            StoredUseCase {
                seq,
                use_case: use_case.clone(),
            },
        );
        Ok(use_case)
    }

    async fn get_by_command(&self, command: &str) -> StoreResult<Option<UseCase>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.use_cases.get(command).map(|s| s.use_case.clone()))
    }

    async fn list_all(&self) -> StoreResult<Vec<UseCaseWithOwner>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut rows: Vec<&StoredUseCase> = tables.use_cases.values().collect();
        rows.sort_by(|a, b| {
            b.use_case
                .timestamp
                .cmp(&a.use_case.timestamp)
                .then(a.seq.cmp(&b.seq))
        });

        Ok(rows
            .into_iter()
            .map(|stored| {
                let owner = tables.users.get(&stored.use_case.user_id).cloned();
                UseCaseWithOwner::new(stored.use_case.clone(), owner)
            })
            .collect())
    }

    async fn update(&self, command: &str, form: &UseCaseForm) -> StoreResult<UseCase> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = tables
            .use_cases
            .get_mut(command)
            .ok_or_else(|| StoreError::not_found(command))?;

        let record = &mut stored.use_case;
        record.title = form.title.clone();
        record.content = form.content.clone();
        record.access_control = form.access_control.clone();
        record.timestamp = next_timestamp(record.timestamp, self.clock.now_epoch_secs());
        Ok(record.clone())
    }

    async fn delete(&self, command: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables.use_cases.remove(command);
        Ok(())
    }
}

/// Group directory held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGroupDirectory {
    groups: Arc<RwLock<Vec<Group>>>,
}

impl MemoryGroupDirectory {
    pub fn new(groups: Vec<Group>) -> Self {
        Self {
            groups: Arc::new(RwLock::new(groups)),
        }
    }

    pub fn add_group(&self, group: Group) -> StoreResult<()> {
        let mut groups = self.groups.write().map_err(|_| StoreError::LockPoisoned)?;
        groups.retain(|g| g.id != group.id);
        groups.push(group);
        Ok(())
    }
}

#[async_trait]
impl GroupDirectory for MemoryGroupDirectory {
    async fn groups_for_member(&self, user_id: &str) -> StoreResult<Vec<Group>> {
        let groups = self.groups.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(groups
            .iter()
            .filter(|g| g.has_member(user_id))
            .cloned()
            .collect())
    }
}
