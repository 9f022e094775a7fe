//! Periodic unlock scan.
//!
//! # Responsibility
//! - Discover due capsules, apply the one-way unlock transition and
//!   trigger owner notification.
//! - Run as a long-lived background thread with an explicit stop
//!   lifecycle.
//!
//! # Invariants
//! - The flip to `unlocked = true` goes through the store's conditional
//!   update, so overlapping ticks or a second scheduler instance on the
//!   same database produce exactly one transition and at most one
//!   notification per capsule.
//! - One failing candidate never aborts the scan of the remaining
//!   candidates.
//! - Notification failure never rolls back an unlock; the next tick
//!   skips the capsule because its flag is already set.

use crate::clock::now_epoch_ms;
use crate::model::capsule::Capsule;
use crate::notify::UnlockNotifier;
use crate::repo::capsule_repo::{CapsuleRepository, SqliteCapsuleRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoError;
use log::{debug, error, info};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Granularity at which the background loop rechecks its stop flag
/// while waiting for the next tick.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Counters for one scan, used for logging and deterministic tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Capsules loaded for this scan.
    pub scanned: usize,
    /// Transitions won by this tick.
    pub unlocked: usize,
    /// Notifications delivered for transitions won by this tick.
    pub notified: usize,
    /// Transitions whose notification attempt failed.
    pub notify_failures: usize,
    /// Candidates aborted by a store failure.
    pub failures: usize,
}

enum CandidateOutcome {
    /// Not due, already unlocked, or the transition was won elsewhere.
    Skipped,
    Unlocked { notified: bool },
}

/// One-shot unlock scan over a capsule/user store.
pub struct UnlockScheduler<C: CapsuleRepository, U: UserRepository, N: UnlockNotifier> {
    capsules: C,
    users: U,
    notifier: N,
}

impl<C: CapsuleRepository, U: UserRepository, N: UnlockNotifier> UnlockScheduler<C, U, N> {
    pub fn new(capsules: C, users: U, notifier: N) -> Self {
        Self {
            capsules,
            users,
            notifier,
        }
    }

    /// Runs one scan against the wall clock.
    pub fn run_tick(&self) -> TickSummary {
        self.run_tick_at(now_epoch_ms())
    }

    /// Runs one scan at an explicit instant.
    ///
    /// Idempotent: a capsule whose flag is already set is skipped, so
    /// repeated ticks never double-unlock or double-notify.
    pub fn run_tick_at(&self, now_ms: i64) -> TickSummary {
        let capsules = match self.capsules.list_all() {
            Ok(capsules) => capsules,
            Err(err) => {
                error!("event=unlock_scan module=scheduler status=error error={err}");
                return TickSummary::default();
            }
        };

        let mut summary = TickSummary {
            scanned: capsules.len(),
            ..TickSummary::default()
        };

        for capsule in &capsules {
            // Per-candidate error boundary: one bad record must never
            // block the rest of the scan.
            match self.process_candidate(capsule, now_ms) {
                Ok(CandidateOutcome::Skipped) => {}
                Ok(CandidateOutcome::Unlocked { notified }) => {
                    summary.unlocked += 1;
                    if notified {
                        summary.notified += 1;
                    } else {
                        summary.notify_failures += 1;
                    }
                    info!(
                        "event=capsule_unlock module=scheduler status=ok capsule_id={} notified={notified}",
                        capsule.uuid
                    );
                }
                Err(err) => {
                    summary.failures += 1;
                    error!(
                        "event=capsule_unlock module=scheduler status=error capsule_id={} error={err}",
                        capsule.uuid
                    );
                }
            }
        }

        summary
    }

    fn process_candidate(
        &self,
        capsule: &Capsule,
        now_ms: i64,
    ) -> Result<CandidateOutcome, RepoError> {
        if !capsule.is_due(now_ms) {
            return Ok(CandidateOutcome::Skipped);
        }

        // Compare-and-set in the store: a concurrent tick may have won
        // the transition between the read above and this write.
        if !self.capsules.try_mark_unlocked(capsule.uuid, now_ms)? {
            return Ok(CandidateOutcome::Skipped);
        }

        // The transition is committed; everything from here is
        // best-effort notification.
        let notified = match self.users.find_by_id(capsule.owner) {
            Ok(Some(owner)) => match self.notifier.notify_unlocked(&owner.email, &capsule.title) {
                Ok(()) => true,
                Err(err) => {
                    error!(
                        "event=unlock_notify module=scheduler status=error capsule_id={} error={err}",
                        capsule.uuid
                    );
                    false
                }
            },
            Ok(None) => {
                error!(
                    "event=unlock_notify module=scheduler status=error capsule_id={} error=owner_missing",
                    capsule.uuid
                );
                false
            }
            Err(err) => {
                error!(
                    "event=unlock_notify module=scheduler status=error capsule_id={} error={err}",
                    capsule.uuid
                );
                false
            }
        };

        Ok(CandidateOutcome::Unlocked { notified })
    }
}

/// Running background scan. Stops (and joins) on [`SchedulerHandle::stop`]
/// or drop, letting an in-flight tick finish its current item.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns the periodic unlock scan on its own named thread.
///
/// The connection is owned by the scan thread; request handlers use
/// their own connections to the same database, and the store-level
/// conditional update keeps the unlock transition single-winner.
/// Ticks run immediately and then every `period`.
pub fn start_unlock_scheduler<N>(
    conn: Connection,
    period: Duration,
    notifier: N,
) -> std::io::Result<SchedulerHandle>
where
    N: UnlockNotifier + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::Builder::new()
        .name("capsule-unlock".into())
        .spawn(move || {
            info!(
                "event=scheduler_start module=scheduler status=ok period_ms={}",
                period.as_millis()
            );

            'ticks: loop {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }

                let scheduler = UnlockScheduler::new(
                    SqliteCapsuleRepository::new(&conn),
                    SqliteUserRepository::new(&conn),
                    &notifier,
                );
                let summary = scheduler.run_tick();
                debug!(
                    "event=unlock_scan module=scheduler status=ok scanned={} unlocked={} notified={} notify_failures={} failures={}",
                    summary.scanned,
                    summary.unlocked,
                    summary.notified,
                    summary.notify_failures,
                    summary.failures
                );

                let mut waited = Duration::ZERO;
                while waited < period {
                    if stop_flag.load(Ordering::Relaxed) {
                        break 'ticks;
                    }
                    let slice = STOP_POLL_INTERVAL.min(period - waited);
                    thread::sleep(slice);
                    waited += slice;
                }
            }

            info!("event=scheduler_stop module=scheduler status=ok");
        })?;

    Ok(SchedulerHandle {
        stop,
        handle: Some(handle),
    })
}
