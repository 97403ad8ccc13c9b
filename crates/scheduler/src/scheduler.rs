// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dependency-graph scheduler (§4.6): five admission rules gate every
//! attempt to start a plan's session, and the plan/phase state machines are
//! advanced only through this module so the rules and the state transitions
//! never drift apart.

use std::sync::Arc;

use gsdh_core::clock::Clock;
use gsdh_core::plan::{Plan, PlanId, PlanStatus};
use gsdh_core::project_state::PLAN_LOOKAHEAD_DEFAULT;
use gsdh_core::session::{Session, SessionStatus};
use gsdh_core::active_file::{ActiveFileEntry, FileMode};
use gsdh_pty::PtySupervisor;
use gsdh_protocol_dir::types::{ActiveFileView, ActiveFilesView};
use gsdh_protocol_dir::ProtocolDir;
use gsdh_storage::Store;

use crate::error::SchedulerError;
use crate::rejection::StartRejection;

pub enum StartOutcome {
    Admitted(Session),
    Rejected(StartRejection),
}

pub struct Scheduler {
    store: Arc<Store>,
    pty: Arc<PtySupervisor>,
    clock: Arc<dyn Clock>,
    plan_lookahead: u32,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, pty: Arc<PtySupervisor>, clock: Arc<dyn Clock>) -> Self {
        Self::with_lookahead(store, pty, clock, PLAN_LOOKAHEAD_DEFAULT)
    }

    pub fn with_lookahead(store: Arc<Store>, pty: Arc<PtySupervisor>, clock: Arc<dyn Clock>, plan_lookahead: u32) -> Self {
        Self { store, pty, clock, plan_lookahead }
    }

    /// Attempt to start a session. When `plan` names a `(phase, plan_number)`
    /// pair, the five admission rules of §4.6 all apply; a bare session
    /// (`plan = None`) is only subject to slot availability.
    pub fn start_session(
        &self,
        project: &str,
        working_dir: &str,
        command: &str,
        plan: Option<(u32, u32)>,
    ) -> Result<StartOutcome, SchedulerError> {
        let plan_row = match plan {
            Some((phase, plan_number)) => {
                let plan_row = self
                    .store
                    .get_plan(project, phase, plan_number)?
                    .ok_or_else(|| SchedulerError::NotFound(format!("plan {project} {phase}.{plan_number}")))?;

                if let Some(rejection) = self.check_admission(project, &plan_row)? {
                    return Ok(StartOutcome::Rejected(rejection));
                }
                Some(plan_row)
            }
            None => None,
        };

        let session = match self.pty.spawn(working_dir, command) {
            Ok(session) => session,
            Err(gsdh_pty::PtyError::SlotFull(n)) => {
                return Ok(StartOutcome::Rejected(StartRejection::SlotFull { n_slots: n }))
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(plan_row) = plan_row {
            self.store.set_plan_status(&plan_row.id, PlanStatus::EXECUTING, false)?;
            let now = self.clock.now_millis();
            for path in &plan_row.files_written {
                self.store.insert_active_file(&ActiveFileEntry::new(path.clone(), session.id, plan_row.id, FileMode::Write, now))?;
            }
            for path in &plan_row.files_read {
                if plan_row.files_written.contains(path) {
                    continue;
                }
                self.store.insert_active_file(&ActiveFileEntry::new(path.clone(), session.id, plan_row.id, FileMode::Read, now))?;
            }
            self.mirror_active_files(working_dir)?;
        }

        Ok(StartOutcome::Admitted(session))
    }

    /// Mirror the current active-file holder map into the Protocol Directory
    /// under `project_root` (§4.5). Best-effort: logged and swallowed on
    /// failure rather than surfaced, same as the PTY Supervisor's mirroring.
    fn mirror_active_files(&self, project_root: &str) -> Result<(), SchedulerError> {
        let mirror = ProtocolDir::new(project_root);
        let files = self
            .store
            .list_active_files()?
            .into_iter()
            .map(|entry| ActiveFileView {
                path: entry.path,
                session: entry.session.to_string(),
                plan: entry.plan.to_string(),
                op: entry.mode.to_string(),
                started_at: entry.started_at,
            })
            .collect();
        let view = ActiveFilesView { timestamp: self.clock.now_millis(), files };
        if let Err(err) = mirror.write_active_files(&view) {
            tracing::warn!(project_root, error = %err, "failed to mirror active files");
        }
        Ok(())
    }

    /// Evaluate rules 1-4 of §4.6 against `plan`. Rule 5 (slot availability)
    /// is checked by the supervisor itself at spawn time.
    fn check_admission(&self, project: &str, plan: &Plan) -> Result<Option<StartRejection>, SchedulerError> {
        let mut missing = Vec::new();
        for dep in &plan.depends_on {
            match self.store.get_plan_by_id(dep)? {
                Some(dep_plan) if dep_plan.status.is_executed_or_verified() => {}
                _ => missing.push(*dep),
            }
        }
        if !missing.is_empty() {
            return Ok(Some(StartRejection::DepsNotMet { missing }));
        }

        let state = self.store.get_or_create_project_state(project)?;
        if !state.passes_verify_gate(plan.phase) {
            let pending = state.pending_verify_phase.unwrap_or(plan.phase);
            return Ok(Some(StartRejection::VerifyGate { pending_verify_phase: pending }));
        }

        let ceiling = state.planning_ceiling(self.plan_lookahead);
        if plan.phase > ceiling {
            return Ok(Some(StartRejection::PlanLookahead { ceiling }));
        }

        let active = self.store.list_active_files()?;
        let mut conflicts = Vec::new();
        for path in &plan.files_written {
            if active.iter().any(|entry| &entry.path == path) {
                conflicts.push(path.clone());
            }
        }
        for path in &plan.files_read {
            if active.iter().any(|entry| &entry.path == path && entry.mode == FileMode::Write) {
                conflicts.push(path.clone());
            }
        }
        if !conflicts.is_empty() {
            conflicts.sort();
            conflicts.dedup();
            return Ok(Some(StartRejection::FileConflict { paths: conflicts }));
        }

        Ok(None)
    }

    /// Plans in `project` immediately eligible to start, in deterministic
    /// `(phase, plan_number)` tie-break order.
    pub fn available_plans(&self, project: &str) -> Result<Vec<Plan>, SchedulerError> {
        let mut plans = self
            .store
            .list_plans(project)?
            .into_iter()
            .filter(|p| p.status == PlanStatus::PLANNED)
            .filter(|p| self.check_admission(project, p).map(|r| r.is_none()).unwrap_or(false))
            .collect::<Vec<_>>();
        plans.sort_by_key(Plan::key);
        Ok(plans)
    }

    /// Record that `plan_id` finished execution: advances `executing ->
    /// executed` and releases its file holds. When every plan in the phase
    /// is now executed, the phase becomes pending verification.
    ///
    /// Requires the session that held `plan_id`'s file locks to have
    /// terminated successfully first (§4.6): a plan cannot be marked
    /// executed while its owning session is still running, or if it failed.
    pub fn complete_plan(&self, plan_id: &PlanId) -> Result<(), SchedulerError> {
        let plan = self
            .store
            .get_plan_by_id(plan_id)?
            .ok_or_else(|| SchedulerError::NotFound(format!("plan {plan_id}")))?;

        let owning = self.store.list_active_files()?.into_iter().filter(|e| &e.plan == plan_id).collect::<Vec<_>>();
        let owning_session_id = owning.first().map(|e| e.session).ok_or_else(|| {
            SchedulerError::PreconditionFailed(format!("plan {plan_id} has no session recorded; cannot verify termination"))
        })?;
        let owning_session = self
            .store
            .get_session(&owning_session_id)?
            .ok_or_else(|| SchedulerError::NotFound(format!("session {owning_session_id}")))?;
        if owning_session.status != SessionStatus::Completed {
            return Err(SchedulerError::PreconditionFailed(format!(
                "plan {plan_id}'s session {owning_session_id} has not terminated successfully (status: {})",
                owning_session.status
            )));
        }

        self.store.set_plan_status(plan_id, PlanStatus::EXECUTED, false)?;

        for entry in &owning {
            self.store.release_active_files_for_session(&entry.session)?;
        }
        self.mirror_active_files(&owning_session.working_dir)?;

        let siblings = self
            .store
            .list_plans(&plan.project)?
            .into_iter()
            .filter(|p| p.phase == plan.phase)
            .collect::<Vec<_>>();
        let all_executed = siblings.iter().all(|p| p.status.is_executed_or_verified());

        let mut state = self.store.get_or_create_project_state(&plan.project)?;
        state.record_phase_executed(plan.phase, all_executed);
        self.store.put_project_state(&state)?;
        Ok(())
    }

    /// Mark every plan in `phase` as `verified`, clearing the pending-verify
    /// gate for that phase.
    pub fn mark_phase_verified(&self, project: &str, phase: u32) -> Result<(), SchedulerError> {
        for plan in self.store.list_plans(project)?.into_iter().filter(|p| p.phase == phase) {
            if plan.status.is_verified() {
                continue;
            }
            self.store.set_plan_status(&plan.id, PlanStatus::VERIFIED, false)?;
        }

        let mut state = self.store.get_or_create_project_state(project)?;
        state.record_phase_verified(phase);
        self.store.put_project_state(&state)?;
        Ok(())
    }

    /// Operator reconciliation (§4.8 `set_execution_state`): directly set the
    /// highest-executed phase, optionally clearing the rest of the state
    /// first. Bypasses the forward-only plan state machine by design.
    pub fn set_execution_state(&self, project: &str, highest_executed: u32, force_reset: bool) -> Result<(), SchedulerError> {
        let mut state = self.store.get_or_create_project_state(project)?;
        if force_reset {
            state.force_reset();
        }
        state.highest_executed = highest_executed;
        state
            .validate_invariants()
            .map_err(SchedulerError::InvalidArgument)?;
        self.store.put_project_state(&state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsdh_core::clock::FakeClock;
    use gsdh_core::event::NullEventPublisher;
    use gsdh_core::plan::Plan;

    fn scheduler() -> (Scheduler, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
        let pty = Arc::new(PtySupervisor::with_slots(store.clone(), Arc::new(NullEventPublisher), clock.clone(), 2));
        (Scheduler::with_lookahead(store.clone(), pty, clock, 5), store)
    }

    #[test]
    fn plan_with_unmet_dependency_is_rejected() {
        let (scheduler, store) = scheduler();
        let dep = Plan::new("/p", 1, 1);
        store.upsert_plan(&dep).unwrap();
        let mut plan = Plan::new("/p", 1, 2);
        plan.depends_on.insert(dep.id);
        store.upsert_plan(&plan).unwrap();

        let rejection = scheduler.check_admission("/p", &plan).unwrap();
        assert!(matches!(rejection, Some(StartRejection::DepsNotMet { .. })));
    }

    #[test]
    fn plan_with_satisfied_dependency_admits() {
        let (scheduler, store) = scheduler();
        let mut dep = Plan::new("/p", 1, 1);
        dep.status = PlanStatus::EXECUTED;
        store.upsert_plan(&dep).unwrap();
        let mut plan = Plan::new("/p", 1, 2);
        plan.depends_on.insert(dep.id);
        store.upsert_plan(&plan).unwrap();

        assert!(scheduler.check_admission("/p", &plan).unwrap().is_none());
    }

    #[test]
    fn verify_gate_blocks_phase_two_ahead() {
        let (scheduler, store) = scheduler();
        let mut state = gsdh_core::project_state::ProjectExecutionState::new("/p");
        state.pending_verify_phase = Some(1);
        store.put_project_state(&state).unwrap();

        let plan = Plan::new("/p", 3, 1);
        store.upsert_plan(&plan).unwrap();
        let rejection = scheduler.check_admission("/p", &plan).unwrap();
        assert!(matches!(rejection, Some(StartRejection::VerifyGate { .. })));
    }

    #[test]
    fn plan_lookahead_blocks_phase_beyond_window() {
        let (scheduler, store) = scheduler();
        let plan = Plan::new("/p", 50, 1);
        store.upsert_plan(&plan).unwrap();
        let rejection = scheduler.check_admission("/p", &plan).unwrap();
        assert!(matches!(rejection, Some(StartRejection::PlanLookahead { .. })));
    }

    #[test]
    fn write_write_conflict_is_rejected() {
        let (scheduler, store) = scheduler();
        let holder_session = gsdh_core::test_support::sample_session(1);
        store.insert_session(&holder_session).unwrap();
        let holder_plan = Plan::new("/p", 1, 1);
        store.upsert_plan(&holder_plan).unwrap();
        store
            .insert_active_file(&ActiveFileEntry::new("a.ts", holder_session.id, holder_plan.id, FileMode::Write, 0))
            .unwrap();

        let mut plan = Plan::new("/p", 1, 2);
        plan.files_written.insert("a.ts".to_string());
        store.upsert_plan(&plan).unwrap();

        let rejection = scheduler.check_admission("/p", &plan).unwrap();
        assert!(matches!(rejection, Some(StartRejection::FileConflict { .. })));
    }

    /// Spawns a session owning `plan`'s write lock and marks it completed,
    /// the precondition `complete_plan` now checks before advancing status.
    fn complete_owning_session(store: &Store, plan: &Plan) -> gsdh_core::session::SessionId {
        let mut session = gsdh_core::test_support::sample_session(1);
        session.status = SessionStatus::Running;
        session.pid = Some(1);
        store.insert_session(&session).unwrap();
        store
            .insert_active_file(&ActiveFileEntry::new("a.ts", session.id, plan.id, FileMode::Write, 0))
            .unwrap();
        store.update_session_status(&session.id, SessionStatus::Completed, None, Some(10)).unwrap();
        session.id
    }

    #[test]
    fn complete_plan_marks_phase_pending_verify_once_all_siblings_executed() {
        let (scheduler, store) = scheduler();
        let plan = Plan::new("/p", 1, 1);
        store.upsert_plan(&plan).unwrap();
        store.set_plan_status(&plan.id, PlanStatus::EXECUTING, false).unwrap();
        complete_owning_session(&store, &plan);

        scheduler.complete_plan(&plan.id).unwrap();

        let fetched = store.get_plan_by_id(&plan.id).unwrap().unwrap();
        assert_eq!(fetched.status, PlanStatus::EXECUTED);
        let state = store.get_project_state("/p").unwrap().unwrap();
        assert_eq!(state.pending_verify_phase, Some(1));
    }

    #[test]
    fn complete_plan_rejects_when_owning_session_still_running() {
        let (scheduler, store) = scheduler();
        let plan = Plan::new("/p", 1, 1);
        store.upsert_plan(&plan).unwrap();
        store.set_plan_status(&plan.id, PlanStatus::EXECUTING, false).unwrap();

        let mut session = gsdh_core::test_support::sample_session(1);
        session.status = SessionStatus::Running;
        session.pid = Some(1);
        store.insert_session(&session).unwrap();
        store
            .insert_active_file(&ActiveFileEntry::new("a.ts", session.id, plan.id, FileMode::Write, 0))
            .unwrap();

        let err = scheduler.complete_plan(&plan.id);
        assert!(matches!(err, Err(SchedulerError::PreconditionFailed(_))));
        let fetched = store.get_plan_by_id(&plan.id).unwrap().unwrap();
        assert_eq!(fetched.status, PlanStatus::EXECUTING);
    }

    #[test]
    fn mark_phase_verified_clears_pending_gate() {
        let (scheduler, store) = scheduler();
        let plan = Plan::new("/p", 1, 1);
        store.upsert_plan(&plan).unwrap();
        store.set_plan_status(&plan.id, PlanStatus::EXECUTING, false).unwrap();
        complete_owning_session(&store, &plan);
        scheduler.complete_plan(&plan.id).unwrap();

        scheduler.mark_phase_verified("/p", 1).unwrap();

        let fetched = store.get_plan_by_id(&plan.id).unwrap().unwrap();
        assert_eq!(fetched.status, PlanStatus::VERIFIED);
        let state = store.get_project_state("/p").unwrap().unwrap();
        assert_eq!(state.pending_verify_phase, None);
        assert_eq!(state.highest_verified, 1);
    }

    #[test]
    fn set_execution_state_force_reset_clears_pending_gate() {
        let (scheduler, store) = scheduler();
        let mut state = gsdh_core::project_state::ProjectExecutionState::new("/p");
        state.pending_verify_phase = Some(4);
        state.highest_executed = 4;
        store.put_project_state(&state).unwrap();

        scheduler.set_execution_state("/p", 2, true).unwrap();

        let fetched = store.get_project_state("/p").unwrap().unwrap();
        assert_eq!(fetched.highest_executed, 2);
        assert_eq!(fetched.pending_verify_phase, None);
    }
}
