// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project Execution State CRUD (§3).

use gsdh_core::project_state::ProjectExecutionState;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::StoreError;
use crate::Store;

fn from_row(row: &Row<'_>) -> rusqlite::Result<ProjectExecutionState> {
    let phase: Option<i64> = row.get("most_advanced_phase")?;
    let plan: Option<i64> = row.get("most_advanced_plan")?;
    Ok(ProjectExecutionState {
        project: row.get("project")?,
        highest_executed: row.get::<_, i64>("highest_executed")? as u32,
        highest_verified: row.get::<_, i64>("highest_verified")? as u32,
        pending_verify_phase: row.get::<_, Option<i64>>("pending_verify_phase")?.map(|p| p as u32),
        most_advanced_executing: match (phase, plan) {
            (Some(p), Some(n)) => Some((p as u32, n as u32)),
            _ => None,
        },
    })
}

impl Store {
    pub fn get_project_state(&self, project: &str) -> Result<Option<ProjectExecutionState>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM project_execution_state WHERE project = ?1", params![project], from_row)
            .optional()
            .map_err(StoreError::from)
    }

    pub fn get_or_create_project_state(&self, project: &str) -> Result<ProjectExecutionState, StoreError> {
        if let Some(state) = self.get_project_state(project)? {
            return Ok(state);
        }
        let fresh = ProjectExecutionState::new(project);
        self.put_project_state(&fresh)?;
        Ok(fresh)
    }

    pub fn put_project_state(&self, state: &ProjectExecutionState) -> Result<(), StoreError> {
        state.validate_invariants().map_err(StoreError::InvalidArgument)?;
        let conn = self.conn.lock();
        let (phase, plan) = state.most_advanced_executing.map_or((None, None), |(p, n)| (Some(p), Some(n)));
        conn.execute(
            "INSERT INTO project_execution_state (project, highest_executed, highest_verified, pending_verify_phase, most_advanced_phase, most_advanced_plan)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(project) DO UPDATE SET
                highest_executed = excluded.highest_executed,
                highest_verified = excluded.highest_verified,
                pending_verify_phase = excluded.pending_verify_phase,
                most_advanced_phase = excluded.most_advanced_phase,
                most_advanced_plan = excluded.most_advanced_plan",
            params![state.project, state.highest_executed, state.highest_verified, state.pending_verify_phase, phase, plan],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_starts_at_zero() {
        let store = Store::open_in_memory().unwrap();
        let state = store.get_or_create_project_state("/p").unwrap();
        assert_eq!(state.highest_executed, 0);
        assert_eq!(state.highest_verified, 0);
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let mut state = ProjectExecutionState::new("/p");
        state.highest_executed = 3;
        state.pending_verify_phase = Some(3);
        state.most_advanced_executing = Some((3, 2));
        store.put_project_state(&state).unwrap();

        let fetched = store.get_project_state("/p").unwrap().unwrap();
        assert_eq!(fetched.highest_executed, 3);
        assert_eq!(fetched.pending_verify_phase, Some(3));
        assert_eq!(fetched.most_advanced_executing, Some((3, 2)));
    }

    #[test]
    fn put_rejects_invariant_violation() {
        let store = Store::open_in_memory().unwrap();
        let mut state = ProjectExecutionState::new("/p");
        state.highest_verified = 5;
        state.highest_executed = 1;
        let err = store.put_project_state(&state);
        assert!(matches!(err, Err(StoreError::InvalidArgument(_))));
    }
}
