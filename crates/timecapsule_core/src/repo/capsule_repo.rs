//! Capsule repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed, per-owner and time-partitioned access to capsules.
//! - Own the conditional unlock update used by the scheduler.
//!
//! # Invariants
//! - Owner-scoped reads collapse "missing" and "owned by someone else"
//!   into `None`; existence never leaks across owners.
//! - `try_mark_unlocked` is the only write path for the `unlocked`
//!   flag, and its SQL guard makes the transition at-most-once and
//!   never early, even across concurrent connections.

use crate::model::capsule::{Capsule, CapsuleId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const CAPSULE_SELECT_SQL: &str = "SELECT
    c.uuid,
    c.owner_uuid,
    c.title,
    c.message,
    c.file_ref,
    c.unlock_at,
    c.unlocked
FROM capsules c";

/// Repository interface for capsule persistence and queries.
pub trait CapsuleRepository {
    /// Persists a new capsule row.
    fn insert(&self, capsule: &Capsule) -> RepoResult<CapsuleId>;
    /// Rewrites mutable content fields of an existing capsule.
    fn update(&self, capsule: &Capsule) -> RepoResult<()>;
    /// Gets one capsule by id regardless of owner.
    fn get(&self, id: CapsuleId) -> RepoResult<Option<Capsule>>;
    /// Gets one capsule by id, constrained to the given owner username.
    fn get_for_owner(&self, id: CapsuleId, username: &str) -> RepoResult<Option<Capsule>>;
    /// Owner's capsules whose reveal time has passed at `now_ms`.
    fn list_for_owner_unlocking_before(
        &self,
        username: &str,
        now_ms: i64,
    ) -> RepoResult<Vec<Capsule>>;
    /// Owner's capsules whose reveal time is still ahead at `now_ms`.
    fn list_for_owner_unlocking_after(
        &self,
        username: &str,
        now_ms: i64,
    ) -> RepoResult<Vec<Capsule>>;
    /// Lists every capsule in the store.
    fn list_all(&self) -> RepoResult<Vec<Capsule>>;
    /// Compare-and-set unlock: flips `unlocked` to `true` only when it
    /// is still `false` and the reveal time has passed. Returns whether
    /// this call won the transition.
    fn try_mark_unlocked(&self, id: CapsuleId, now_ms: i64) -> RepoResult<bool>;
    /// Hard-deletes one capsule row.
    fn delete(&self, id: CapsuleId) -> RepoResult<()>;
}

/// SQLite-backed capsule repository.
pub struct SqliteCapsuleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCapsuleRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CapsuleRepository for SqliteCapsuleRepository<'_> {
    fn insert(&self, capsule: &Capsule) -> RepoResult<CapsuleId> {
        capsule.validate()?;

        self.conn.execute(
            "INSERT INTO capsules (
                uuid,
                owner_uuid,
                title,
                message,
                file_ref,
                unlock_at,
                unlocked
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                capsule.uuid.to_string(),
                capsule.owner.to_string(),
                capsule.title.as_str(),
                capsule.message.as_str(),
                capsule.file_ref.as_deref(),
                capsule.unlock_at,
                bool_to_int(capsule.unlocked),
            ],
        )?;

        Ok(capsule.uuid)
    }

    fn update(&self, capsule: &Capsule) -> RepoResult<()> {
        capsule.validate()?;

        // Owner and unlocked are deliberately absent from the SET list:
        // ownership is immutable and the flag moves only through
        // try_mark_unlocked.
        let changed = self.conn.execute(
            "UPDATE capsules
             SET
                title = ?1,
                message = ?2,
                file_ref = ?3,
                unlock_at = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                capsule.title.as_str(),
                capsule.message.as_str(),
                capsule.file_ref.as_deref(),
                capsule.unlock_at,
                capsule.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::CapsuleNotFound(capsule.uuid));
        }

        Ok(())
    }

    fn get(&self, id: CapsuleId) -> RepoResult<Option<Capsule>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAPSULE_SELECT_SQL} WHERE c.uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_capsule_row(row)?));
        }

        Ok(None)
    }

    fn get_for_owner(&self, id: CapsuleId, username: &str) -> RepoResult<Option<Capsule>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAPSULE_SELECT_SQL}
             JOIN users u ON u.uuid = c.owner_uuid
             WHERE c.uuid = ?1 AND u.username = ?2;"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), username])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_capsule_row(row)?));
        }

        Ok(None)
    }

    fn list_for_owner_unlocking_before(
        &self,
        username: &str,
        now_ms: i64,
    ) -> RepoResult<Vec<Capsule>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAPSULE_SELECT_SQL}
             JOIN users u ON u.uuid = c.owner_uuid
             WHERE u.username = ?1
               AND c.unlock_at IS NOT NULL
               AND c.unlock_at <= ?2
             ORDER BY c.unlock_at ASC, c.uuid ASC;"
        ))?;

        let rows = stmt.query(params![username, now_ms])?;
        collect_capsules(rows)
    }

    fn list_for_owner_unlocking_after(
        &self,
        username: &str,
        now_ms: i64,
    ) -> RepoResult<Vec<Capsule>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CAPSULE_SELECT_SQL}
             JOIN users u ON u.uuid = c.owner_uuid
             WHERE u.username = ?1
               AND c.unlock_at IS NOT NULL
               AND c.unlock_at > ?2
             ORDER BY c.unlock_at ASC, c.uuid ASC;"
        ))?;

        let rows = stmt.query(params![username, now_ms])?;
        collect_capsules(rows)
    }

    fn list_all(&self) -> RepoResult<Vec<Capsule>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CAPSULE_SELECT_SQL} ORDER BY c.uuid ASC;"))?;

        let rows = stmt.query([])?;
        collect_capsules(rows)
    }

    fn try_mark_unlocked(&self, id: CapsuleId, now_ms: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE capsules
             SET
                unlocked = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND unlocked = 0
               AND unlock_at IS NOT NULL
               AND unlock_at <= ?2;",
            params![id.to_string(), now_ms],
        )?;

        Ok(changed == 1)
    }

    fn delete(&self, id: CapsuleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM capsules WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::CapsuleNotFound(id));
        }

        Ok(())
    }
}

fn collect_capsules(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Capsule>> {
    let mut capsules = Vec::new();
    while let Some(row) = rows.next()? {
        capsules.push(parse_capsule_row(row)?);
    }
    Ok(capsules)
}

fn parse_capsule_row(row: &Row<'_>) -> RepoResult<Capsule> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in capsules.uuid"))
    })?;

    let owner_text: String = row.get("owner_uuid")?;
    let owner = Uuid::parse_str(&owner_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{owner_text}` in capsules.owner_uuid"
        ))
    })?;

    let unlocked = match row.get::<_, i64>("unlocked")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid unlocked value `{other}` in capsules.unlocked"
            )));
        }
    };

    let capsule = Capsule {
        uuid,
        owner,
        title: row.get("title")?,
        message: row.get("message")?,
        file_ref: row.get("file_ref")?,
        unlock_at: row.get("unlock_at")?,
        unlocked,
    };
    capsule.validate()?;
    Ok(capsule)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
