//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for capsules and
//!   users.
//! - Isolate SQLite query details from service/scheduler orchestration.
//!
//! # Invariants
//! - Capsule writes must enforce `Capsule::validate()` before SQL
//!   mutations.
//! - Read paths must reject invalid persisted state instead of masking
//!   it.
//! - The `unlocked` flag is only ever flipped through the conditional
//!   update in [`capsule_repo::CapsuleRepository::try_mark_unlocked`].

use crate::db::DbError;
use crate::model::capsule::{CapsuleId, CapsuleValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod capsule_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence and query error for capsule/user repositories.
#[derive(Debug)]
pub enum RepoError {
    Validation(CapsuleValidationError),
    Db(DbError),
    CapsuleNotFound(CapsuleId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::CapsuleNotFound(id) => write!(f, "capsule not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::CapsuleNotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<CapsuleValidationError> for RepoError {
    fn from(value: CapsuleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
