//! Unlock notification boundary.
//!
//! # Responsibility
//! - Define the contract the scheduler uses to tell an owner their
//!   capsule opened.
//!
//! # Invariants
//! - Delivery is best-effort: a failure here never rolls back an
//!   unlock transition, the scheduler only logs it.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Delivery failure reported by a notifier implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Transport-level failure with a human-readable reason.
    Delivery(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery(reason) => write!(f, "notification delivery failed: {reason}"),
        }
    }
}

impl Error for NotifyError {}

/// Outbound contract for "your capsule is unlocked" events.
///
/// The production mail transport lives outside the core behind this
/// trait; [`LogNotifier`] is the built-in stand-in.
pub trait UnlockNotifier {
    fn notify_unlocked(&self, address: &str, title: &str) -> Result<(), NotifyError>;
}

impl<T: UnlockNotifier + ?Sized> UnlockNotifier for &T {
    fn notify_unlocked(&self, address: &str, title: &str) -> Result<(), NotifyError> {
        (**self).notify_unlocked(address, title)
    }
}

/// Notifier that records unlock events in the structured log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UnlockNotifier for LogNotifier {
    fn notify_unlocked(&self, address: &str, title: &str) -> Result<(), NotifyError> {
        info!("event=unlock_notify module=notify status=ok recipient={address} title={title}");
        Ok(())
    }
}
