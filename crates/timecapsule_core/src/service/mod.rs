//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce ownership and lock-state rules on every capsule mutation.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Only the scheduler's conditional update flips `unlocked`.

pub mod admin_service;
pub mod capsule_service;
