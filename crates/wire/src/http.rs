// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Axum wiring for the Tool-Call Endpoint (§4.8, §6). Every handler here is a
//! thin adapter: request parsing and JSON shaping only, with all behavior
//! living in [`crate::api`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gsdh_core::message::{OrchestratorMessageType, WorkerMessageId, WorkerMessageType};
use gsdh_core::session::SessionId;
use gsdh_core::ErrorEnvelope;
use gsdh_scheduler::StartOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api;
use crate::error::WireError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(start_session).get(list_sessions))
        .route("/api/sessions/{id}/end", post(end_session))
        .route("/api/sessions/{id}/output", get(get_output))
        .route("/api/sessions/{id}/resize", post(resize))
        .route("/api/sessions/{id}/messages", post(worker_report))
        .route("/api/sessions/{id}/await", get(worker_await))
        .route("/api/sessions/{id}/checkpoint", get(get_checkpoint))
        .route("/api/messages/pending", get(get_pending))
        .route("/api/messages/{id}/respond", post(respond))
        .route("/api/projects/{project}/state", get(get_project_state))
        .route("/api/projects/{project}/plans", get(list_plans))
        .route("/api/projects/{project}/execution-state", post(set_execution_state))
        .route("/api/projects/{project}/phases/{phase}/verify", post(mark_phase_verified))
        .route("/api/plans/{id}/complete", post(complete_plan))
        .route("/api/projects/{project}/sync", post(sync_state))
        .route("/api/wait", post(wait_for_state_change))
        .route("/ws/dashboard", get(crate::dashboard::ws_handler))
        .with_state(state)
}

fn wire_err(err: WireError) -> Response {
    let harness_err: gsdh_core::HarnessError = err.into();
    let status = match harness_err.kind {
        gsdh_core::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        gsdh_core::ErrorKind::Conflict => StatusCode::CONFLICT,
        gsdh_core::ErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        gsdh_core::ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        gsdh_core::ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        gsdh_core::ErrorKind::IoFailure
        | gsdh_core::ErrorKind::ChildFailure
        | gsdh_core::ErrorKind::OrphanDetected => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let envelope: ErrorEnvelope = (&harness_err).into();
    (status, Json(envelope)).into_response()
}

#[derive(Deserialize)]
struct StartSessionRequest {
    project: String,
    working_dir: String,
    command: String,
    phase: Option<u32>,
    plan_number: Option<u32>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StartSessionResponse {
    Ok { session: SessionId, slot: u32 },
    Rejected(gsdh_scheduler::StartRejection),
}

async fn start_session(State(state): State<AppState>, Json(req): Json<StartSessionRequest>) -> Response {
    let plan = match (req.phase, req.plan_number) {
        (Some(phase), Some(plan_number)) => Some((phase, plan_number)),
        _ => None,
    };
    match api::start_session(&state, &req.project, &req.working_dir, &req.command, plan).await {
        Ok(StartOutcome::Admitted(session)) => {
            Json(StartSessionResponse::Ok { session: session.id, slot: session.slot.0 }).into_response()
        }
        Ok(StartOutcome::Rejected(rejection)) => {
            (StatusCode::CONFLICT, Json(StartSessionResponse::Rejected(rejection))).into_response()
        }
        Err(err) => wire_err(err),
    }
}

async fn list_sessions(State(state): State<AppState>) -> Response {
    match api::list_sessions(&state) {
        Ok(sessions) => Json(sessions).into_response(),
        Err(err) => wire_err(err),
    }
}

async fn end_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = SessionId::from_string(id);
    match api::end_session(&state, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct OutputQuery {
    lines: Option<usize>,
    since: Option<i64>,
}

async fn get_output(State(state): State<AppState>, Path(id): Path<String>, Query(q): Query<OutputQuery>) -> Response {
    let id = SessionId::from_string(id);
    match api::get_output(&state, &id, q.lines, q.since) {
        Ok(chunks) => Json(chunks).into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct ResizeRequest {
    cols: u16,
    rows: u16,
}

async fn resize(State(state): State<AppState>, Path(id): Path<String>, Json(req): Json<ResizeRequest>) -> Response {
    let id = SessionId::from_string(id);
    match api::resize(&state, &id, req.cols, req.rows) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct WorkerReportRequest {
    message_type: WorkerMessageType,
    payload: Value,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum WorkerReportResponse {
    Settled,
    Pending { message_id: WorkerMessageId },
}

async fn worker_report(State(state): State<AppState>, Path(id): Path<String>, Json(req): Json<WorkerReportRequest>) -> Response {
    let id = SessionId::from_string(id);
    match api::worker_report(&state, &id, req.message_type, req.payload) {
        Ok(api::WorkerReportResult::Settled) => Json(WorkerReportResponse::Settled).into_response(),
        Ok(api::WorkerReportResult::Pending(msg)) => {
            Json(WorkerReportResponse::Pending { message_id: msg.id }).into_response()
        }
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct AwaitQuery {
    timeout_ms: Option<i64>,
}

async fn worker_await(State(state): State<AppState>, Path(id): Path<String>, Query(q): Query<AwaitQuery>) -> Response {
    let id = SessionId::from_string(id);
    let timeout = q.timeout_ms.unwrap_or(state.await_timeout_millis);
    match api::worker_await(&state, &id, timeout).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct RespondRequest {
    session: SessionId,
    response_type: OrchestratorMessageType,
    payload: Value,
}

async fn respond(State(state): State<AppState>, Path(id): Path<String>, Json(req): Json<RespondRequest>) -> Response {
    let id = WorkerMessageId::from_string(id);
    match api::respond(&state, &id, &req.session, req.response_type, req.payload) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct PendingQuery {
    session: Option<String>,
}

async fn get_pending(State(state): State<AppState>, Query(q): Query<PendingQuery>) -> Response {
    let session = q.session.map(SessionId::from_string);
    match api::get_pending(&state, session.as_ref()) {
        Ok(pending) => Json(pending).into_response(),
        Err(err) => wire_err(err),
    }
}

async fn get_checkpoint(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = SessionId::from_string(id);
    match api::get_checkpoint(&state, &id) {
        Ok(checkpoint) => Json(checkpoint).into_response(),
        Err(err) => wire_err(err),
    }
}

async fn get_project_state(State(state): State<AppState>, Path(project): Path<String>) -> Response {
    match api::get_project_state(&state, &project) {
        Ok(project_state) => Json(project_state).into_response(),
        Err(err) => wire_err(err),
    }
}

async fn list_plans(State(state): State<AppState>, Path(project): Path<String>) -> Response {
    match api::list_plans(&state, &project) {
        Ok(plans) => Json(plans).into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct SetExecutionStateRequest {
    highest_executed: u32,
    #[serde(default)]
    force_reset: bool,
}

async fn set_execution_state(State(state): State<AppState>, Path(project): Path<String>, Json(req): Json<SetExecutionStateRequest>) -> Response {
    match api::set_execution_state(&state, &project, req.highest_executed, req.force_reset) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => wire_err(err),
    }
}

async fn mark_phase_verified(State(state): State<AppState>, Path((project, phase)): Path<(String, u32)>) -> Response {
    match api::mark_phase_verified(&state, &project, phase) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => wire_err(err),
    }
}

async fn complete_plan(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = gsdh_core::plan::PlanId::from_string(id);
    match api::complete_plan(&state, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct SyncStateRequest {
    project_root: String,
}

#[derive(Serialize)]
struct SyncStateResponse {
    touched: u32,
}

async fn sync_state(State(state): State<AppState>, Path(project): Path<String>, Json(req): Json<SyncStateRequest>) -> Response {
    match api::sync_state(&state, &project, std::path::Path::new(&req.project_root)) {
        Ok(touched) => Json(SyncStateResponse { touched }).into_response(),
        Err(err) => wire_err(err),
    }
}

#[derive(Deserialize)]
struct WaitRequest {
    session_ids: Vec<String>,
    timeout_ms: Option<i64>,
}

async fn wait_for_state_change(State(state): State<AppState>, Json(req): Json<WaitRequest>) -> Response {
    let ids: Vec<SessionId> = req.session_ids.into_iter().map(SessionId::from_string).collect();
    let timeout = req.timeout_ms.unwrap_or(state.await_timeout_millis);
    match api::wait_for_state_change(&state, &ids, timeout).await {
        Ok(changed) => Json(changed).into_response(),
        Err(err) => wire_err(err),
    }
}
