// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active Files CRUD: the write/read holder map (§3, §4.6 rule 4).

use gsdh_core::active_file::{ActiveFileEntry, FileMode};
use gsdh_core::plan::PlanId;
use gsdh_core::session::SessionId;
use rusqlite::{params, Row};

use crate::error::StoreError;
use crate::Store;

fn from_row(row: &Row<'_>) -> rusqlite::Result<ActiveFileEntry> {
    let mode: String = row.get("mode")?;
    Ok(ActiveFileEntry {
        path: row.get("path")?,
        session: SessionId::from_string(row.get::<_, String>("session_id")?),
        plan: PlanId::from_string(row.get::<_, String>("plan_id")?),
        mode: if mode == "write" { FileMode::Write } else { FileMode::Read },
        started_at: row.get("started_at")?,
    })
}

impl Store {
    pub fn insert_active_file(&self, entry: &ActiveFileEntry) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO active_files (path, session_id, plan_id, mode, started_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.path, entry.session.as_str(), entry.plan.as_str(), entry.mode.to_string(), entry.started_at],
        )?;
        Ok(())
    }

    pub fn list_active_files(&self) -> Result<Vec<ActiveFileEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM active_files ORDER BY path ASC, started_at ASC")?;
        let rows = stmt.query_map([], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Released when a plan's session reaches a terminal status (§5).
    pub fn release_active_files_for_session(&self, session: &SessionId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM active_files WHERE session_id = ?1", params![session.as_str()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_for(session: SessionId, path: &str, mode: FileMode) -> ActiveFileEntry {
        ActiveFileEntry::new(path, session, PlanId::new(), mode, 0)
    }

    fn seeded_session(store: &Store) -> SessionId {
        let session = gsdh_core::test_support::sample_session(1);
        store.insert_session(&session).unwrap();
        session.id
    }

    #[test]
    fn insert_and_list_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let session = seeded_session(&store);
        let e = entry_for(session, "a.ts", FileMode::Write);
        store.insert_active_file(&e).unwrap();
        let files = store.list_active_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.ts");
    }

    #[test]
    fn release_clears_sessions_entries() {
        let store = Store::open_in_memory().unwrap();
        let session = seeded_session(&store);
        let e = entry_for(session.clone(), "a.ts", FileMode::Write);
        store.insert_active_file(&e).unwrap();
        store.release_active_files_for_session(&session).unwrap();
        assert!(store.list_active_files().unwrap().is_empty());
    }
}
