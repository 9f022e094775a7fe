//! Core domain logic for the time-capsule service.
//! This crate is the single source of truth for the locked/unlocked
//! lifecycle invariants and the unlock scan.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod scheduler;
pub mod service;

pub use clock::{now_epoch_ms, ONE_YEAR_MS};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::capsule::{Capsule, CapsuleId, CapsuleValidationError, MAX_MESSAGE_CHARS};
pub use model::user::{Role, User, UserId};
pub use notify::{LogNotifier, NotifyError, UnlockNotifier};
pub use repo::capsule_repo::{CapsuleRepository, SqliteCapsuleRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use scheduler::{start_unlock_scheduler, SchedulerHandle, TickSummary, UnlockScheduler};
pub use service::admin_service::AdminService;
pub use service::capsule_service::{
    CapsulePatch, CapsuleService, CapsuleServiceError, NewCapsule, ServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
