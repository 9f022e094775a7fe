//! User identity model.
//!
//! # Responsibility
//! - Define the resolved identity capsules are owned by.
//! - Keep credential material opaque to the core.
//!
//! # Invariants
//! - `username` and `email` are unique across the store.
//! - The core never inspects or verifies `password_hash`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a user.
pub type UserId = Uuid;

/// Coarse authorization role. Enforcement happens outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular capsule owner. The default for new accounts.
    Member,
    /// May call the read-only reporting surface.
    Admin,
}

/// Resolved identity as handed to the core by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    pub username: String,
    /// Opaque credential material, stored but never interpreted here.
    pub password_hash: String,
    /// Notification address for unlock events.
    pub email: String,
    pub role: Role,
}

impl User {
    /// Creates a member-role user with a generated stable ID.
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            email: email.into(),
            role: Role::Member,
        }
    }
}
