//! Capsule lifecycle service.
//!
//! # Responsibility
//! - Provide the user-facing create/get/list/update/delete operations.
//! - Enforce creation defaults, ownership checks and the
//!   locked/unlocked mutation gate.
//!
//! # Invariants
//! - A capsule's content is frozen once it is unlocked; `update`
//!   rejects any patch with `InvalidState`.
//! - `get`/`update` collapse "missing" and "foreign owner" into
//!   `NotFound`; `delete` distinguishes `Forbidden`. The asymmetry is
//!   intentional: reads must not leak existence, deletion may.
//! - A resolved reveal time must lie strictly in the future at
//!   creation, on both creation paths.

use crate::clock::{now_epoch_ms, ONE_YEAR_MS};
use crate::model::capsule::{Capsule, CapsuleId, CapsuleValidationError};
use crate::repo::capsule_repo::CapsuleRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, CapsuleServiceError>;

/// Lifecycle service error taxonomy.
#[derive(Debug)]
pub enum CapsuleServiceError {
    /// Capsule missing, or present but owned by someone else.
    NotFound(CapsuleId),
    /// Requester is not the owner, where the operation says so openly.
    Forbidden(CapsuleId),
    /// Resolved reveal time is not strictly in the future.
    InvalidSchedule { unlock_at: i64, now: i64 },
    /// Mutation attempted on an already-unlocked capsule.
    InvalidState(CapsuleId),
    /// Capsule content violates model bounds.
    Validation(CapsuleValidationError),
    /// The owner/requester identity does not resolve to a user.
    UnknownOwner(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CapsuleServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "capsule not found: {id}"),
            Self::Forbidden(id) => write!(f, "not authorized to delete capsule {id}"),
            Self::InvalidSchedule { unlock_at, now } => write!(
                f,
                "unlock time {unlock_at} must be strictly after current time {now}"
            ),
            Self::InvalidState(id) => write!(f, "capsule {id} is already unlocked"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownOwner(username) => write!(f, "unknown user: {username}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CapsuleServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CapsuleServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::CapsuleNotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Request model for capsule creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCapsule {
    pub title: String,
    pub message: String,
    /// Reveal time in epoch milliseconds. Defaults to one year ahead.
    pub unlock_at: Option<i64>,
}

/// Partial update for a still-locked capsule. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapsulePatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub unlock_at: Option<i64>,
}

/// Use-case service for the capsule lifecycle.
pub struct CapsuleService<C: CapsuleRepository, U: UserRepository> {
    capsules: C,
    users: U,
}

impl<C: CapsuleRepository, U: UserRepository> CapsuleService<C, U> {
    pub fn new(capsules: C, users: U) -> Self {
        Self { capsules, users }
    }

    /// Creates a locked capsule for `owner_username`.
    ///
    /// # Contract
    /// - Missing `unlock_at` defaults to one year from a single clock
    ///   read.
    /// - A reveal time not strictly in the future fails with
    ///   `InvalidSchedule`.
    pub fn create(&self, owner_username: &str, request: &NewCapsule) -> ServiceResult<Capsule> {
        self.create_capsule(owner_username, request, None)
    }

    /// Creates a locked capsule carrying a pre-stored attachment
    /// reference from the file-storage collaborator.
    pub fn create_with_attachment(
        &self,
        owner_username: &str,
        request: &NewCapsule,
        file_ref: &str,
    ) -> ServiceResult<Capsule> {
        self.create_capsule(owner_username, request, Some(file_ref))
    }

    fn create_capsule(
        &self,
        owner_username: &str,
        request: &NewCapsule,
        file_ref: Option<&str>,
    ) -> ServiceResult<Capsule> {
        let owner = self.resolve_owner(owner_username)?;

        let now = now_epoch_ms();
        let unlock_at = request.unlock_at.unwrap_or(now + ONE_YEAR_MS);
        if unlock_at <= now {
            return Err(CapsuleServiceError::InvalidSchedule { unlock_at, now });
        }

        let mut capsule = Capsule::new(owner.uuid, &request.title, &request.message, unlock_at);
        capsule.file_ref = file_ref.map(str::to_string);
        self.capsules.insert(&capsule)?;

        info!(
            "event=capsule_create module=service status=ok capsule_id={} owner={} unlock_at={unlock_at} has_file={}",
            capsule.uuid,
            owner_username,
            capsule.file_ref.is_some()
        );
        Ok(capsule)
    }

    /// Gets one capsule by id for its owner.
    ///
    /// A capsule owned by someone else reads as `NotFound`, the same as
    /// a missing one.
    pub fn get(&self, id: CapsuleId, requester: &str) -> ServiceResult<Capsule> {
        self.capsules
            .get_for_owner(id, requester)?
            .ok_or(CapsuleServiceError::NotFound(id))
    }

    /// Lists the requester's capsules whose reveal time has passed.
    pub fn list_unlocked(&self, owner_username: &str) -> ServiceResult<Vec<Capsule>> {
        self.resolve_owner(owner_username)?;
        let capsules = self
            .capsules
            .list_for_owner_unlocking_before(owner_username, now_epoch_ms())?;
        Ok(capsules)
    }

    /// Lists the requester's capsules whose reveal time is still ahead.
    pub fn list_locked(&self, owner_username: &str) -> ServiceResult<Vec<Capsule>> {
        self.resolve_owner(owner_username)?;
        let capsules = self
            .capsules
            .list_for_owner_unlocking_after(owner_username, now_epoch_ms())?;
        Ok(capsules)
    }

    /// Applies a partial update to a still-locked capsule.
    ///
    /// # Contract
    /// - Same `NotFound` collapse as [`CapsuleService::get`].
    /// - Fails with `InvalidState` once the capsule is unlocked,
    ///   regardless of which fields are patched.
    pub fn update(
        &self,
        id: CapsuleId,
        requester: &str,
        patch: CapsulePatch,
    ) -> ServiceResult<Capsule> {
        let mut capsule = self
            .capsules
            .get_for_owner(id, requester)?
            .ok_or(CapsuleServiceError::NotFound(id))?;

        if capsule.unlocked {
            return Err(CapsuleServiceError::InvalidState(id));
        }

        if let Some(title) = patch.title {
            capsule.title = title;
        }
        if let Some(message) = patch.message {
            capsule.message = message;
        }
        if let Some(unlock_at) = patch.unlock_at {
            capsule.unlock_at = Some(unlock_at);
        }

        self.capsules.update(&capsule)?;
        info!("event=capsule_update module=service status=ok capsule_id={id}");
        Ok(capsule)
    }

    /// Deletes one capsule, in any lock state.
    ///
    /// Unlike `get`/`update`, a foreign capsule here reads as
    /// `Forbidden` rather than `NotFound`.
    pub fn delete(&self, id: CapsuleId, requester: &str) -> ServiceResult<()> {
        let capsule = self
            .capsules
            .get(id)?
            .ok_or(CapsuleServiceError::NotFound(id))?;

        let owner = self.users.find_by_id(capsule.owner)?.ok_or_else(|| {
            RepoError::InvalidData(format!("capsule {id} references missing owner"))
        })?;

        if owner.username != requester {
            return Err(CapsuleServiceError::Forbidden(id));
        }

        self.capsules.delete(id)?;
        info!("event=capsule_delete module=service status=ok capsule_id={id}");
        Ok(())
    }

    fn resolve_owner(&self, username: &str) -> ServiceResult<crate::model::user::User> {
        self.users
            .find_by_username(username)?
            .ok_or_else(|| CapsuleServiceError::UnknownOwner(username.to_string()))
    }
}
