use rusqlite::{params, Connection};
use timecapsule_core::db::open_db_in_memory;
use timecapsule_core::{
    now_epoch_ms, AdminService, Capsule, CapsuleRepository, Role, SqliteCapsuleRepository,
    SqliteUserRepository, User, UserRepository,
};

fn admin(
    conn: &Connection,
) -> AdminService<SqliteCapsuleRepository<'_>, SqliteUserRepository<'_>> {
    AdminService::new(
        SqliteCapsuleRepository::new(conn),
        SqliteUserRepository::new(conn),
    )
}

fn seed_user(conn: &Connection, username: &str) -> User {
    let user = User::new(username, "opaque-hash", format!("{username}@example.com"));
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user
}

fn seed_capsule(conn: &Connection, owner: &User, title: &str, unlock_at: i64) -> Capsule {
    let capsule = Capsule::new(owner.uuid, title, "sealed message", unlock_at);
    SqliteCapsuleRepository::new(conn).insert(&capsule).unwrap();
    capsule
}

#[test]
fn capsule_counts_include_users_without_capsules() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice");
    let bob = seed_user(&conn, "bob");
    seed_user(&conn, "carol");

    let later = now_epoch_ms() + 60_000;
    seed_capsule(&conn, &alice, "a1", later);
    seed_capsule(&conn, &alice, "a2", later);
    seed_capsule(&conn, &bob, "b1", later);

    let stats = admin(&conn).capsule_count_per_owner().unwrap();
    assert_eq!(stats.get("alice"), Some(&2));
    assert_eq!(stats.get("bob"), Some(&1));
    assert_eq!(stats.get("carol"), Some(&0));
    assert_eq!(stats.len(), 3);
}

#[test]
fn partitions_split_on_reveal_time_and_skip_missing_times() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice");

    let now = now_epoch_ms();
    let revealed = seed_capsule(&conn, &alice, "past", now + 60_000);
    conn.execute(
        "UPDATE capsules SET unlock_at = ?1 WHERE uuid = ?2;",
        params![now - 60_000, revealed.uuid.to_string()],
    )
    .unwrap();
    let sealed = seed_capsule(&conn, &alice, "future", now + 60_000);
    let dateless = seed_capsule(&conn, &alice, "never", now + 60_000);
    conn.execute(
        "UPDATE capsules SET unlock_at = NULL WHERE uuid = ?1;",
        params![dateless.uuid.to_string()],
    )
    .unwrap();

    let service = admin(&conn);
    assert_eq!(service.all_capsules().unwrap().len(), 3);

    let unlocked = service.unlocked_capsules_at(now).unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].uuid, revealed.uuid);

    let locked = service.locked_capsules_at(now).unwrap();
    assert_eq!(locked.len(), 1);
    assert_eq!(locked[0].uuid, sealed.uuid);
}

#[test]
fn all_users_lists_every_account_sorted_by_username() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "zoe");
    seed_user(&conn, "alice");

    let users = admin(&conn).all_users().unwrap();
    let names: Vec<&str> = users.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "zoe"]);
    assert!(users.iter().all(|user| user.role == Role::Member));
}

#[test]
fn capsule_serializes_with_stable_field_names() {
    let conn = open_db_in_memory().unwrap();
    let alice = seed_user(&conn, "alice");
    let capsule = seed_capsule(&conn, &alice, "snapshot", now_epoch_ms() + 60_000);

    let value = serde_json::to_value(&capsule).unwrap();
    assert_eq!(value["title"], "snapshot");
    assert_eq!(value["unlocked"], false);
    assert_eq!(value["owner"], alice.uuid.to_string());
    assert!(value["unlock_at"].is_i64());
    assert!(value["file_ref"].is_null());
}
