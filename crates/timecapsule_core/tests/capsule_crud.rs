use rusqlite::{params, Connection};
use timecapsule_core::db::open_db_in_memory;
use timecapsule_core::{
    now_epoch_ms, CapsulePatch, CapsuleRepository, CapsuleService, CapsuleServiceError,
    NewCapsule, SqliteCapsuleRepository, SqliteUserRepository, User, UserRepository,
    MAX_MESSAGE_CHARS, ONE_YEAR_MS,
};
use uuid::Uuid;

fn service(
    conn: &Connection,
) -> CapsuleService<SqliteCapsuleRepository<'_>, SqliteUserRepository<'_>> {
    CapsuleService::new(
        SqliteCapsuleRepository::new(conn),
        SqliteUserRepository::new(conn),
    )
}

fn seed_user(conn: &Connection, username: &str) -> User {
    let user = User::new(username, "opaque-hash", format!("{username}@example.com"));
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user
}

fn future_request(title: &str) -> NewCapsule {
    NewCapsule {
        title: title.to_string(),
        message: "sealed message".to_string(),
        unlock_at: Some(now_epoch_ms() + 60_000),
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let created = service.create("alice", &future_request("graduation")).unwrap();
    assert!(!created.unlocked);
    assert!(created.file_ref.is_none());

    let loaded = service.get(created.uuid, "alice").unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn create_defaults_unlock_time_to_one_year_ahead() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let before = now_epoch_ms();
    let created = service
        .create(
            "alice",
            &NewCapsule {
                title: "no date given".to_string(),
                message: "m".to_string(),
                unlock_at: None,
            },
        )
        .unwrap();
    let after = now_epoch_ms();

    let unlock_at = created.unlock_at.unwrap();
    assert!(unlock_at >= before + ONE_YEAR_MS);
    assert!(unlock_at <= after + ONE_YEAR_MS);
}

#[test]
fn create_rejects_unlock_time_not_strictly_in_future() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let err = service
        .create(
            "alice",
            &NewCapsule {
                title: "too late".to_string(),
                message: "m".to_string(),
                unlock_at: Some(now_epoch_ms() - 1_000),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CapsuleServiceError::InvalidSchedule { .. }));
}

#[test]
fn create_rejects_oversized_message() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let err = service
        .create(
            "alice",
            &NewCapsule {
                title: "big".to_string(),
                message: "x".repeat(MAX_MESSAGE_CHARS + 1),
                unlock_at: Some(now_epoch_ms() + 60_000),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CapsuleServiceError::Validation(_)));
}

#[test]
fn create_for_unknown_owner_fails() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service.create("nobody", &future_request("t")).unwrap_err();
    assert!(matches!(err, CapsuleServiceError::UnknownOwner(name) if name == "nobody"));
}

#[test]
fn create_with_attachment_stores_file_ref_and_still_validates_schedule() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let created = service
        .create_with_attachment("alice", &future_request("with file"), "uploads/letter.pdf")
        .unwrap();
    assert_eq!(created.file_ref.as_deref(), Some("uploads/letter.pdf"));

    let err = service
        .create_with_attachment(
            "alice",
            &NewCapsule {
                title: "stale".to_string(),
                message: "m".to_string(),
                unlock_at: Some(now_epoch_ms() - 1),
            },
            "uploads/other.pdf",
        )
        .unwrap_err();
    assert!(matches!(err, CapsuleServiceError::InvalidSchedule { .. }));
}

#[test]
fn get_by_non_owner_reads_as_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    seed_user(&conn, "bob");
    let service = service(&conn);

    let created = service.create("alice", &future_request("private")).unwrap();

    let err = service.get(created.uuid, "bob").unwrap_err();
    assert!(matches!(err, CapsuleServiceError::NotFound(id) if id == created.uuid));

    let err = service.get(Uuid::new_v4(), "bob").unwrap_err();
    assert!(matches!(err, CapsuleServiceError::NotFound(_)));
}

#[test]
fn update_patches_only_provided_fields() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let created = service.create("alice", &future_request("draft")).unwrap();
    let updated = service
        .update(
            created.uuid,
            "alice",
            CapsulePatch {
                title: Some("final".to_string()),
                message: None,
                unlock_at: None,
            },
        )
        .unwrap();

    assert_eq!(updated.title, "final");
    assert_eq!(updated.message, created.message);
    assert_eq!(updated.unlock_at, created.unlock_at);

    let loaded = service.get(created.uuid, "alice").unwrap();
    assert_eq!(loaded, updated);
}

#[test]
fn update_by_non_owner_reads_as_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    seed_user(&conn, "bob");
    let service = service(&conn);

    let created = service.create("alice", &future_request("private")).unwrap();
    let err = service
        .update(created.uuid, "bob", CapsulePatch::default())
        .unwrap_err();
    assert!(matches!(err, CapsuleServiceError::NotFound(_)));
}

#[test]
fn update_unlocked_capsule_fails_invalid_state() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let created = service.create("alice", &future_request("frozen")).unwrap();
    let unlock_at = created.unlock_at.unwrap();
    let repo = SqliteCapsuleRepository::new(&conn);
    assert!(repo.try_mark_unlocked(created.uuid, unlock_at).unwrap());

    let err = service
        .update(
            created.uuid,
            "alice",
            CapsulePatch {
                title: Some("rewrite history".to_string()),
                ..CapsulePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CapsuleServiceError::InvalidState(id) if id == created.uuid));

    // Content stayed frozen.
    let loaded = service.get(created.uuid, "alice").unwrap();
    assert_eq!(loaded.title, "frozen");
    assert!(loaded.unlocked);
}

#[test]
fn delete_distinguishes_forbidden_from_not_found() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    seed_user(&conn, "bob");
    let service = service(&conn);

    let created = service.create("alice", &future_request("mine")).unwrap();

    let err = service.delete(created.uuid, "bob").unwrap_err();
    assert!(matches!(err, CapsuleServiceError::Forbidden(id) if id == created.uuid));

    let err = service.delete(Uuid::new_v4(), "bob").unwrap_err();
    assert!(matches!(err, CapsuleServiceError::NotFound(_)));

    service.delete(created.uuid, "alice").unwrap();
    let err = service.get(created.uuid, "alice").unwrap_err();
    assert!(matches!(err, CapsuleServiceError::NotFound(_)));
}

#[test]
fn delete_is_allowed_after_unlock() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let created = service.create("alice", &future_request("opened")).unwrap();
    let repo = SqliteCapsuleRepository::new(&conn);
    assert!(repo
        .try_mark_unlocked(created.uuid, created.unlock_at.unwrap())
        .unwrap());

    service.delete(created.uuid, "alice").unwrap();
}

#[test]
fn list_locked_and_unlocked_partition_by_reveal_time() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "alice");
    let service = service(&conn);

    let locked = service.create("alice", &future_request("still ahead")).unwrap();
    let revealed = service.create("alice", &future_request("already past")).unwrap();
    conn.execute(
        "UPDATE capsules SET unlock_at = ?1 WHERE uuid = ?2;",
        params![now_epoch_ms() - 120_000, revealed.uuid.to_string()],
    )
    .unwrap();

    let unlocked_list = service.list_unlocked("alice").unwrap();
    assert_eq!(unlocked_list.len(), 1);
    assert_eq!(unlocked_list[0].uuid, revealed.uuid);

    let locked_list = service.list_locked("alice").unwrap();
    assert_eq!(locked_list.len(), 1);
    assert_eq!(locked_list[0].uuid, locked.uuid);
}
