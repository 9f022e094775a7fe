//! Read-only reporting service.
//!
//! # Responsibility
//! - Expose whole-store views: all users, all capsules, the
//!   locked/unlocked time partitions, per-owner counts.
//!
//! # Invariants
//! - Purely read-side; never mutates capsules or users.
//! - A capsule without a reveal time appears in neither partition.
//! - "Caller is an administrator" is enforced outside the core.

use crate::clock::now_epoch_ms;
use crate::model::capsule::Capsule;
use crate::model::user::User;
use crate::repo::capsule_repo::CapsuleRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use std::collections::BTreeMap;

/// Read-only reporting over the full capsule/user store.
pub struct AdminService<C: CapsuleRepository, U: UserRepository> {
    capsules: C,
    users: U,
}

impl<C: CapsuleRepository, U: UserRepository> AdminService<C, U> {
    pub fn new(capsules: C, users: U) -> Self {
        Self { capsules, users }
    }

    pub fn all_users(&self) -> RepoResult<Vec<User>> {
        self.users.list_users()
    }

    pub fn all_capsules(&self) -> RepoResult<Vec<Capsule>> {
        self.capsules.list_all()
    }

    /// Capsules whose reveal time has passed, store-wide.
    pub fn unlocked_capsules(&self) -> RepoResult<Vec<Capsule>> {
        self.unlocked_capsules_at(now_epoch_ms())
    }

    /// Time-partition view at an explicit instant, for deterministic
    /// reporting and tests.
    pub fn unlocked_capsules_at(&self, now_ms: i64) -> RepoResult<Vec<Capsule>> {
        let capsules = self.capsules.list_all()?;
        Ok(capsules
            .into_iter()
            .filter(|capsule| capsule.is_revealed_at(now_ms))
            .collect())
    }

    /// Capsules whose reveal time is still ahead, store-wide.
    pub fn locked_capsules(&self) -> RepoResult<Vec<Capsule>> {
        self.locked_capsules_at(now_epoch_ms())
    }

    pub fn locked_capsules_at(&self, now_ms: i64) -> RepoResult<Vec<Capsule>> {
        let capsules = self.capsules.list_all()?;
        Ok(capsules
            .into_iter()
            .filter(|capsule| capsule.is_sealed_at(now_ms))
            .collect())
    }

    /// Capsule count per owner username, zero-count owners included.
    pub fn capsule_count_per_owner(&self) -> RepoResult<BTreeMap<String, u64>> {
        let users = self.users.list_users()?;
        let capsules = self.capsules.list_all()?;

        let mut counts_by_id = BTreeMap::new();
        for capsule in &capsules {
            *counts_by_id.entry(capsule.owner).or_insert(0u64) += 1;
        }

        let mut stats = BTreeMap::new();
        for user in users {
            let count = counts_by_id.get(&user.uuid).copied().unwrap_or(0);
            stats.insert(user.username, count);
        }

        Ok(stats)
    }
}
