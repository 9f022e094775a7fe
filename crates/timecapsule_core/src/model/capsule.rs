//! Capsule domain model.
//!
//! # Responsibility
//! - Define the capsule record and its reveal-time lifecycle helpers.
//! - Enforce content bounds before anything reaches persistence.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another capsule.
//! - `owner` is set at creation and never reassigned.
//! - `unlocked == true` is only ever produced by the store-level
//!   compare-and-set, which also checks `unlock_at <= now`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::model::user::UserId;

/// Stable identifier for a capsule.
pub type CapsuleId = Uuid;

/// Upper bound for `message`, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Validation failures for capsule content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsuleValidationError {
    /// `message` exceeds [`MAX_MESSAGE_CHARS`].
    MessageTooLong { length: usize, max: usize },
}

impl Display for CapsuleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MessageTooLong { length, max } => {
                write!(f, "capsule message has {length} characters, maximum is {max}")
            }
        }
    }
}

impl Error for CapsuleValidationError {}

/// A message that becomes readable once its reveal time has passed.
///
/// `unlock_at` is epoch milliseconds. Creation paths always assign it;
/// the `Option` mirrors the storage shape, where a missing reveal time
/// simply keeps the capsule out of both time partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capsule {
    /// Stable global ID used for lookup, auditing and notification logs.
    pub uuid: CapsuleId,
    /// Owning user. Immutable for the capsule lifetime.
    pub owner: UserId,
    pub title: String,
    /// Free-text body, capped at [`MAX_MESSAGE_CHARS`] characters.
    pub message: String,
    /// Opaque reference to externally stored attachment content.
    pub file_ref: Option<String>,
    /// Scheduled reveal time in epoch milliseconds.
    pub unlock_at: Option<i64>,
    /// One-way visibility flag. Starts `false`, flips to `true` once.
    pub unlocked: bool,
}

impl Capsule {
    /// Creates a locked capsule with a generated stable ID.
    pub fn new(
        owner: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        unlock_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            owner,
            title: title.into(),
            message: message.into(),
            file_ref: None,
            unlock_at: Some(unlock_at),
            unlocked: false,
        }
    }

    /// Checks content bounds. Called on every repository write and on
    /// row read-back.
    pub fn validate(&self) -> Result<(), CapsuleValidationError> {
        let length = self.message.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(CapsuleValidationError::MessageTooLong {
                length,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(())
    }

    /// Whether the unlock scheduler should transition this capsule now.
    pub fn is_due(&self, now_ms: i64) -> bool {
        !self.unlocked && self.unlock_at.is_some_and(|at| at <= now_ms)
    }

    /// Time-partition membership: reveal time has passed.
    ///
    /// A capsule without a reveal time is in neither partition.
    pub fn is_revealed_at(&self, now_ms: i64) -> bool {
        self.unlock_at.is_some_and(|at| at <= now_ms)
    }

    /// Time-partition membership: reveal time is still ahead.
    pub fn is_sealed_at(&self, now_ms: i64) -> bool {
        self.unlock_at.is_some_and(|at| at > now_ms)
    }
}
