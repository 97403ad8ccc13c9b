// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan CRUD (§3, §4.6). Plans are never deleted, only advanced or reset.

use std::collections::BTreeSet;

use gsdh_core::plan::{Plan, PlanId, PlanStatus, VerificationManifest};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::StoreError;
use crate::Store;

fn status_from_str(s: &str) -> PlanStatus {
    match s {
        "planned" => PlanStatus::PLANNED,
        "executing" => PlanStatus::EXECUTING,
        "executed" => PlanStatus::EXECUTED,
        "verified" => PlanStatus::VERIFIED,
        other => unreachable!("unknown plan status in store: {other}"),
    }
}

fn set_from_json(s: &str) -> BTreeSet<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn ids_from_json(s: &str) -> BTreeSet<PlanId> {
    let raw: Vec<String> = serde_json::from_str(s).unwrap_or_default();
    raw.into_iter().map(PlanId::from_string).collect()
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    let depends_on: String = row.get("depends_on")?;
    let files_written: String = row.get("files_written")?;
    let files_read: String = row.get("files_read")?;
    let verification: String = row.get("verification")?;
    Ok(Plan {
        id: PlanId::from_string(row.get::<_, String>("id")?),
        project: row.get("project")?,
        phase: row.get::<_, i64>("phase")? as u32,
        plan_number: row.get::<_, i64>("plan_number")? as u32,
        status: status_from_str(&row.get::<_, String>("status")?),
        depends_on: ids_from_json(&depends_on),
        files_written: set_from_json(&files_written),
        files_read: set_from_json(&files_read),
        autonomous: row.get::<_, i64>("autonomous")? != 0,
        verification: serde_json::from_str::<VerificationManifest>(&verification).unwrap_or_default(),
    })
}

impl Store {
    pub fn upsert_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let depends_on: Vec<&str> = plan.depends_on.iter().map(|id| id.as_str()).collect();
        conn.execute(
            "INSERT INTO plans (id, project, phase, plan_number, status, depends_on, files_written, files_read, autonomous, verification)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(project, phase, plan_number) DO UPDATE SET
                status = excluded.status,
                depends_on = excluded.depends_on,
                files_written = excluded.files_written,
                files_read = excluded.files_read,
                autonomous = excluded.autonomous,
                verification = excluded.verification",
            params![
                plan.id.as_str(),
                plan.project,
                plan.phase,
                plan.plan_number,
                plan.status.to_string(),
                serde_json::to_string(&depends_on)?,
                serde_json::to_string(&plan.files_written)?,
                serde_json::to_string(&plan.files_read)?,
                plan.autonomous as i64,
                serde_json::to_string(&plan.verification)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_plan(&self, project: &str, phase: u32, plan_number: u32) -> Result<Option<Plan>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM plans WHERE project = ?1 AND phase = ?2 AND plan_number = ?3",
            params![project, phase, plan_number],
            from_row,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn get_plan_by_id(&self, id: &PlanId) -> Result<Option<Plan>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM plans WHERE id = ?1", params![id.as_str()], from_row)
            .optional()
            .map_err(StoreError::from)
    }

    pub fn list_plans(&self, project: &str) -> Result<Vec<Plan>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT * FROM plans WHERE project = ?1 ORDER BY phase ASC, plan_number ASC")?;
        let rows = stmt.query_map(params![project], from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    /// Advance a plan's status, enforcing the forward-only state machine
    /// unless `force` bypasses it for an operator reset.
    pub fn set_plan_status(&self, id: &PlanId, status: PlanStatus, force: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let current: Option<String> =
            conn.query_row("SELECT status FROM plans WHERE id = ?1", params![id.as_str()], |row| row.get(0))
                .optional()?;
        let current = current.ok_or_else(|| StoreError::NotFound(format!("plan {id}")))?;
        let current = status_from_str(&current);

        if !force && !current.can_advance_to(status) {
            return Err(StoreError::PreconditionFailed(format!(
                "plan {id}: illegal transition {current} -> {status}"
            )));
        }

        conn.execute("UPDATE plans SET status = ?1 WHERE id = ?2", params![status.to_string(), id.as_str()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsdh_core::test_support::sample_plan;

    #[test]
    fn upsert_then_fetch_round_trips_by_key() {
        let store = Store::open_in_memory().unwrap();
        let plan = sample_plan("/p", 1, 1);
        store.upsert_plan(&plan).unwrap();
        let fetched = store.get_plan("/p", 1, 1).unwrap().unwrap();
        assert_eq!(fetched.id, plan.id);
        assert_eq!(fetched.status, PlanStatus::PLANNED);
    }

    #[test]
    fn set_plan_status_enforces_forward_only() {
        let store = Store::open_in_memory().unwrap();
        let plan = sample_plan("/p", 1, 1);
        store.upsert_plan(&plan).unwrap();
        let err = store.set_plan_status(&plan.id, PlanStatus::VERIFIED, false);
        assert!(matches!(err, Err(StoreError::PreconditionFailed(_))));
    }

    #[test]
    fn force_reset_bypasses_state_machine() {
        let store = Store::open_in_memory().unwrap();
        let mut plan = sample_plan("/p", 1, 1);
        plan.status = PlanStatus::VERIFIED;
        store.upsert_plan(&plan).unwrap();
        store.set_plan_status(&plan.id, PlanStatus::PLANNED, true).unwrap();
        let fetched = store.get_plan_by_id(&plan.id).unwrap().unwrap();
        assert_eq!(fetched.status, PlanStatus::PLANNED);
    }

    #[test]
    fn list_plans_orders_by_phase_then_plan_number() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_plan(&sample_plan("/p", 2, 1)).unwrap();
        store.upsert_plan(&sample_plan("/p", 1, 2)).unwrap();
        store.upsert_plan(&sample_plan("/p", 1, 1)).unwrap();
        let plans = store.list_plans("/p").unwrap();
        let keys: Vec<_> = plans.iter().map(Plan::key).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);
    }
}
