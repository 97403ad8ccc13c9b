// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session CRUD.

use gsdh_core::clock::MillisSinceEpoch;
use gsdh_core::session::{Session, SessionId, SessionStatus, SlotId};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::StoreError;
use crate::Store;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get("status")?;
    Ok(Session {
        id: SessionId::from_string(row.get::<_, String>("id")?),
        slot: SlotId(row.get("slot")?),
        working_dir: row.get("working_dir")?,
        command: row.get("command")?,
        pid: row.get::<_, Option<i64>>("pid")?.map(|p| p as u32),
        status: parse_status(&status),
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        last_polled_at: row.get("last_polled_at")?,
        orphaned: row.get::<_, i64>("orphaned")? != 0,
        usage: row
            .get::<_, Option<String>>("usage_json")?
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

fn parse_status(s: &str) -> SessionStatus {
    match s {
        "idle" => SessionStatus::Idle,
        "running" => SessionStatus::Running,
        "waiting_checkpoint" => SessionStatus::WaitingCheckpoint,
        "completed" => SessionStatus::Completed,
        "failed" => SessionStatus::Failed,
        other => unreachable!("unknown session status in store: {other}"),
    }
}

impl Store {
    pub fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (id, slot, working_dir, command, pid, status, started_at, ended_at, last_polled_at, orphaned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.id.as_str(),
                session.slot.0,
                session.working_dir,
                session.command,
                session.pid.map(|p| p as i64),
                session.status.to_string(),
                session.started_at,
                session.ended_at,
                session.last_polled_at,
                session.orphaned as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM sessions WHERE id = ?1", params![id.as_str()], from_row)
            .optional()
            .map_err(StoreError::from)
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM sessions ORDER BY started_at ASC")?;
        let rows = stmt.query_map([], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Sessions whose slot is occupied by a non-terminal session, used for
    /// slot admission in the scheduler.
    pub fn active_session_count(&self) -> Result<u32, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM sessions WHERE status IN ('idle','running','waiting_checkpoint')",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    pub fn sessions_in_non_terminal_status(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM sessions WHERE status IN ('idle','running','waiting_checkpoint') ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map([], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    pub fn update_session_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
        pid: Option<u32>,
        ended_at: Option<MillisSinceEpoch>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE sessions SET status = ?1, pid = ?2, ended_at = ?3 WHERE id = ?4",
            params![status.to_string(), pid.map(|p| p as i64), ended_at, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    /// Flip `status` alone, leaving `pid` and `ended_at` untouched. For
    /// transitions like `running -> waiting_checkpoint` where the session is
    /// still alive and `update_session_status`'s blanket pid/ended_at
    /// overwrite would be wrong.
    pub fn set_session_status_only(&self, id: &SessionId, status: SessionStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed =
            conn.execute("UPDATE sessions SET status = ?1 WHERE id = ?2", params![status.to_string(), id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    pub fn mark_session_orphaned_failed(
        &self,
        id: &SessionId,
        ended_at: MillisSinceEpoch,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE sessions SET status = 'failed', ended_at = ?1, orphaned = 1 WHERE id = ?2",
            params![ended_at, id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    pub fn touch_last_polled(&self, id: &SessionId, at: MillisSinceEpoch) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed =
            conn.execute("UPDATE sessions SET last_polled_at = ?1 WHERE id = ?2", params![at, id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    /// Records the latest usage figure reported alongside a `progress_update`
    /// message. Overwrites any prior figure; the store keeps only the latest.
    pub fn update_session_usage(&self, id: &SessionId, usage: &serde_json::Value) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let encoded = serde_json::to_string(usage).map_err(|e| StoreError::InvalidArgument(e.to_string()))?;
        let changed =
            conn.execute("UPDATE sessions SET usage_json = ?1 WHERE id = ?2", params![encoded, id.as_str()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("session {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsdh_core::test_support::sample_session;

    #[test]
    fn insert_and_fetch_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let session = sample_session(1);
        store.insert_session(&session).unwrap();
        let fetched = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.status, SessionStatus::Idle);
    }

    #[test]
    fn unknown_session_returns_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_session(&SessionId::new()).unwrap().is_none());
    }

    #[test]
    fn update_status_requires_existing_row() {
        let store = Store::open_in_memory().unwrap();
        let err = store.update_session_status(&SessionId::new(), SessionStatus::Failed, None, Some(0));
        assert!(matches!(err, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn waiting_checkpoint_transition_preserves_pid() {
        let store = Store::open_in_memory().unwrap();
        let mut session = sample_session(1);
        session.status = SessionStatus::Running;
        session.pid = Some(42);
        store.insert_session(&session).unwrap();

        store.set_session_status_only(&session.id, SessionStatus::WaitingCheckpoint).unwrap();

        let fetched = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::WaitingCheckpoint);
        assert_eq!(fetched.pid, Some(42));
    }

    #[test]
    fn mark_orphaned_sets_failed_and_flag() {
        let store = Store::open_in_memory().unwrap();
        let mut session = sample_session(1);
        session.status = SessionStatus::Running;
        session.pid = Some(42);
        store.insert_session(&session).unwrap();
        store.mark_session_orphaned_failed(&session.id, 100).unwrap();
        let fetched = store.get_session(&session.id).unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Failed);
        assert!(fetched.orphaned);
        assert_eq!(fetched.ended_at, Some(100));
    }
}
