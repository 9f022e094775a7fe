//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `timecapsule_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use timecapsule_core::db::migrations::latest_version;
use timecapsule_core::db::open_db_in_memory;
use timecapsule_core::{
    LogNotifier, SqliteCapsuleRepository, SqliteUserRepository, UnlockScheduler,
};

fn main() {
    println!(
        "timecapsule_core version={}",
        timecapsule_core::core_version()
    );

    let conn = match open_db_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("timecapsule_core schema bootstrap failed: {err}");
            std::process::exit(1);
        }
    };
    println!("timecapsule_core schema={}", latest_version());

    // One scan over the empty store proves the scheduler wiring.
    let scheduler = UnlockScheduler::new(
        SqliteCapsuleRepository::new(&conn),
        SqliteUserRepository::new(&conn),
        LogNotifier,
    );
    let summary = scheduler.run_tick();
    println!(
        "timecapsule_core smoke_tick scanned={} unlocked={}",
        summary.scanned, summary.unlocked
    );
}
