// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Tool-Call Endpoint's operations (§4.8), transport-agnostic. `http.rs`
//! wires these onto axum routes; each function here is also directly
//! unit-testable without standing up a server.

use gsdh_core::checkpoint::Checkpoint;
use gsdh_core::event::Event;
use gsdh_core::message::{
    OrchestratorMessage, OrchestratorMessageType, WorkerMessage, WorkerMessageType,
};
use gsdh_core::output::OutputChunk;
use gsdh_core::plan::PlanId;
use gsdh_core::project_state::ProjectExecutionState;
use gsdh_core::session::{Session, SessionId};
use gsdh_scheduler::StartOutcome;
use serde_json::Value;

use crate::error::WireError;
use crate::state::AppState;

pub async fn start_session(
    state: &AppState,
    project: &str,
    working_dir: &str,
    command: &str,
    plan: Option<(u32, u32)>,
) -> Result<StartOutcome, WireError> {
    let scheduler = state.scheduler.clone();
    let project = project.to_string();
    let working_dir = working_dir.to_string();
    let command = command.to_string();
    let outcome = tokio::task::spawn_blocking(move || scheduler.start_session(&project, &working_dir, &command, plan))
        .await
        .map_err(|e| WireError::InvalidArgument(e.to_string()))??;
    Ok(outcome)
}

pub fn list_sessions(state: &AppState) -> Result<Vec<Session>, WireError> {
    Ok(state.store.list_sessions()?)
}

pub fn end_session(state: &AppState, session: &SessionId) -> Result<(), WireError> {
    state.store.get_session(session)?.ok_or_else(|| WireError::NotFound(format!("session {session}")))?;
    state.pty.end_session(session)?;
    state.store.release_active_files_for_session(session)?;
    Ok(())
}

pub fn get_output(
    state: &AppState,
    session: &SessionId,
    lines: Option<usize>,
    since: Option<i64>,
) -> Result<Vec<OutputChunk>, WireError> {
    state.store.get_session(session)?.ok_or_else(|| WireError::NotFound(format!("session {session}")))?;
    match (since, lines) {
        (Some(since), _) => Ok(state.store.get_output_since(session, since)?),
        (None, Some(n)) => Ok(state.store.get_output_tail(session, n)?),
        (None, None) => Ok(state.store.get_output(session)?),
    }
}

pub fn resize(state: &AppState, session: &SessionId, cols: u16, rows: u16) -> Result<(), WireError> {
    state.pty.resize(session, cols, rows)?;
    Ok(())
}

pub enum WorkerReportResult {
    Settled,
    Pending(WorkerMessage),
}

pub fn worker_report(
    state: &AppState,
    session: &SessionId,
    message_type: WorkerMessageType,
    payload: Value,
) -> Result<WorkerReportResult, WireError> {
    state.store.get_session(session)?.ok_or_else(|| WireError::NotFound(format!("session {session}")))?;
    let now = state.clock.now_millis();
    let msg = WorkerMessage::new(*session, message_type, payload.clone(), now);
    state.store.insert_worker_message(&msg)?;

    if message_type == WorkerMessageType::ProgressUpdate {
        if let Some(usage) = payload.get("usage") {
            state.store.update_session_usage(session, usage)?;
        }
    }

    if msg.is_awaitable_pending() {
        state.bus.publish(Event::SessionCheckpoint { session: *session, message_id: msg.id, payload, at: now });
        Ok(WorkerReportResult::Pending(msg))
    } else {
        Ok(WorkerReportResult::Settled)
    }
}

/// Long-poll for a response to the most recently reported response-required
/// message of `session`. Returns `None` on `AWAIT_TIMEOUT`, never an error,
/// matching §5's "returns an empty result on timeout" contract.
pub async fn worker_await(state: &AppState, session: &SessionId, timeout_millis: i64) -> Result<Option<OrchestratorMessage>, WireError> {
    let target = state
        .store
        .get_pending(Some(session))?
        .into_iter()
        .max_by_key(|m| m.created_at);
    let Some(target) = target else { return Ok(None) };

    let poll = async {
        loop {
            if let Some(response) = state.store.get_orchestrator_response_for(&target.id)? {
                return Ok(response);
            }
            tokio::time::sleep(state.poll_interval()).await;
        }
    };
    match tokio::time::timeout(std::time::Duration::from_millis(timeout_millis.max(0) as u64), poll).await {
        Ok(result) => result.map(Some),
        Err(_) => Ok(None),
    }
}

pub fn respond(
    state: &AppState,
    worker_message_id: &gsdh_core::message::WorkerMessageId,
    session: &SessionId,
    response_type: OrchestratorMessageType,
    payload: Value,
) -> Result<(), WireError> {
    let now = state.clock.now_millis();
    let response = OrchestratorMessage::new(*session, response_type, payload.clone(), Some(*worker_message_id), now);
    state.store.respond_to_worker_message(&response, &payload, now)?;
    Ok(())
}

pub fn get_pending(state: &AppState, session: Option<&SessionId>) -> Result<Vec<WorkerMessage>, WireError> {
    Ok(state.store.get_pending(session)?)
}

pub fn get_checkpoint(state: &AppState, session: &SessionId) -> Result<Option<Checkpoint>, WireError> {
    let pending = state.store.get_pending(Some(session))?;
    Ok(Checkpoint::current(pending.iter()))
}

pub fn get_project_state(state: &AppState, project: &str) -> Result<ProjectExecutionState, WireError> {
    Ok(state.store.get_or_create_project_state(project)?)
}

pub fn list_plans(state: &AppState, project: &str) -> Result<Vec<gsdh_core::plan::Plan>, WireError> {
    Ok(state.store.list_plans(project)?)
}

pub fn set_execution_state(state: &AppState, project: &str, highest_executed: u32, force_reset: bool) -> Result<(), WireError> {
    state.scheduler.set_execution_state(project, highest_executed, force_reset)?;
    Ok(())
}

pub fn mark_phase_verified(state: &AppState, project: &str, phase: u32) -> Result<(), WireError> {
    state.scheduler.mark_phase_verified(project, phase)?;
    Ok(())
}

pub fn complete_plan(state: &AppState, plan: &PlanId) -> Result<(), WireError> {
    state.scheduler.complete_plan(plan)?;
    Ok(())
}

/// `sync_state` (§4.8): rescans `project_root`'s Plan Documents and
/// reconciles them into the Durable Store. Returns the number of plans
/// touched.
pub fn sync_state(state: &AppState, project: &str, project_root: &std::path::Path) -> Result<u32, WireError> {
    Ok(gsdh_scheduler::sync_state(&state.store, project_root, project)?)
}

/// Long-poll across several sessions, returning the first one observed to
/// change `status` since the call began, or `None` on timeout.
pub async fn wait_for_state_change(state: &AppState, sessions: &[SessionId], timeout_millis: i64) -> Result<Option<SessionId>, WireError> {
    use std::collections::HashMap;

    let mut baseline: HashMap<SessionId, String> = HashMap::new();
    for id in sessions {
        if let Some(session) = state.store.get_session(id)? {
            baseline.insert(*id, session.status.to_string());
        }
    }

    let poll = async {
        loop {
            for id in sessions {
                if let Some(session) = state.store.get_session(id)? {
                    if baseline.get(id).map(|s| s.as_str()) != Some(session.status.to_string().as_str()) {
                        return Ok(*id);
                    }
                }
            }
            tokio::time::sleep(state.poll_interval()).await;
        }
    };
    match tokio::time::timeout(std::time::Duration::from_millis(timeout_millis.max(0) as u64), poll).await {
        Ok(result) => result.map(Some),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsdh_core::clock::{Clock, FakeClock};
    use gsdh_core::event::NullEventPublisher;
    use gsdh_pty::PtySupervisor;
    use gsdh_scheduler::Scheduler;
    use gsdh_storage::Store;
    use serde_json::json;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
        let pty = Arc::new(PtySupervisor::with_slots(store.clone(), Arc::new(NullEventPublisher), clock.clone(), 2));
        let scheduler = Arc::new(Scheduler::new(store.clone(), pty.clone(), clock.clone()));
        AppState::new(store, scheduler, pty, Arc::new(crate::bus::EventBus::new()), clock)
    }

    #[test]
    fn worker_report_informational_settles_without_checkpoint_event() {
        let state = test_state();
        let session = gsdh_core::test_support::sample_session(1);
        state.store.insert_session(&session).unwrap();

        let result = worker_report(&state, &session.id, WorkerMessageType::TaskStarted, json!({})).unwrap();
        assert!(matches!(result, WorkerReportResult::Settled));
    }

    #[test]
    fn worker_report_response_required_returns_pending_message() {
        let state = test_state();
        let session = gsdh_core::test_support::sample_session(1);
        state.store.insert_session(&session).unwrap();

        let result = worker_report(&state, &session.id, WorkerMessageType::DecisionNeeded, json!({"q": 1})).unwrap();
        assert!(matches!(result, WorkerReportResult::Pending(_)));
    }

    #[tokio::test]
    async fn worker_await_resolves_once_responded() {
        let state = test_state();
        let session = gsdh_core::test_support::sample_session(1);
        state.store.insert_session(&session).unwrap();
        let WorkerReportResult::Pending(msg) =
            worker_report(&state, &session.id, WorkerMessageType::DecisionNeeded, json!({})).unwrap()
        else {
            panic!("expected pending");
        };
        respond(&state, &msg.id, &session.id, OrchestratorMessageType::DecisionMade, json!({"ok": true})).unwrap();

        let response = worker_await(&state, &session.id, 1_000).await.unwrap();
        assert!(response.is_some());
    }

    #[tokio::test]
    async fn worker_await_times_out_without_response() {
        let state = test_state();
        let session = gsdh_core::test_support::sample_session(1);
        state.store.insert_session(&session).unwrap();
        worker_report(&state, &session.id, WorkerMessageType::DecisionNeeded, json!({})).unwrap();

        let response = worker_await(&state, &session.id, 10).await.unwrap();
        assert!(response.is_none());
    }

    #[test]
    fn get_checkpoint_returns_none_with_no_pending_messages() {
        let state = test_state();
        let session = gsdh_core::test_support::sample_session(1);
        state.store.insert_session(&session).unwrap();
        assert!(get_checkpoint(&state, &session.id).unwrap().is_none());
    }
}
