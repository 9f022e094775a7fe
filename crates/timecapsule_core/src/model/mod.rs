//! Domain model for time-gated capsules and their owners.
//!
//! # Responsibility
//! - Define the canonical data structures used by core business logic.
//! - Keep the locked/unlocked lifecycle rules next to the data they guard.
//!
//! # Invariants
//! - Every capsule and user is identified by a stable UUID.
//! - A capsule's `unlocked` flag only ever moves from `false` to `true`.

pub mod capsule;
pub mod user;
