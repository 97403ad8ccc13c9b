// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker/orchestrator message CRUD (§3, §4.4).

use gsdh_core::clock::MillisSinceEpoch;
use gsdh_core::message::{
    OrchestratorMessage, OrchestratorMessageId, OrchestratorMessageType, WorkerMessage, WorkerMessageId,
    WorkerMessageStatus, WorkerMessageType,
};
use gsdh_core::session::SessionId;
use rusqlite::{params, OptionalExtension, Row};

use crate::error::StoreError;
use crate::Store;

fn worker_message_type_from_str(s: &str) -> WorkerMessageType {
    match s {
        "session_ready" => WorkerMessageType::SessionReady,
        "task_started" => WorkerMessageType::TaskStarted,
        "progress_update" => WorkerMessageType::ProgressUpdate,
        "task_completed" => WorkerMessageType::TaskCompleted,
        "task_failed" => WorkerMessageType::TaskFailed,
        "verification_needed" => WorkerMessageType::VerificationNeeded,
        "decision_needed" => WorkerMessageType::DecisionNeeded,
        "action_needed" => WorkerMessageType::ActionNeeded,
        "credentials_needed" => WorkerMessageType::CredentialsNeeded,
        other => unreachable!("unknown worker message type in store: {other}"),
    }
}

fn worker_status_from_str(s: &str) -> WorkerMessageStatus {
    match s {
        "pending" => WorkerMessageStatus::Pending,
        "responded" => WorkerMessageStatus::Responded,
        "expired" => WorkerMessageStatus::Expired,
        other => unreachable!("unknown worker message status in store: {other}"),
    }
}

fn orchestrator_message_type_from_str(s: &str) -> OrchestratorMessageType {
    match s {
        "assign_task" => OrchestratorMessageType::AssignTask,
        "verification_result" => OrchestratorMessageType::VerificationResult,
        "decision_made" => OrchestratorMessageType::DecisionMade,
        "action_completed" => OrchestratorMessageType::ActionCompleted,
        "credentials_provided" => OrchestratorMessageType::CredentialsProvided,
        "abort_task" => OrchestratorMessageType::AbortTask,
        other => unreachable!("unknown orchestrator message type in store: {other}"),
    }
}

fn worker_message_from_row(row: &Row<'_>) -> rusqlite::Result<WorkerMessage> {
    let payload: String = row.get("payload")?;
    let response_payload: Option<String> = row.get("response_payload")?;
    Ok(WorkerMessage {
        id: WorkerMessageId::from_string(row.get::<_, String>("id")?),
        session: SessionId::from_string(row.get::<_, String>("session_id")?),
        message_type: worker_message_type_from_str(&row.get::<_, String>("message_type")?),
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        status: worker_status_from_str(&row.get::<_, String>("status")?),
        created_at: row.get("created_at")?,
        responded_at: row.get("responded_at")?,
        response_payload: response_payload.and_then(|p| serde_json::from_str(&p).ok()),
    })
}

fn orchestrator_message_from_row(row: &Row<'_>) -> rusqlite::Result<OrchestratorMessage> {
    let payload: String = row.get("payload")?;
    let in_response_to: Option<String> = row.get("in_response_to")?;
    Ok(OrchestratorMessage {
        id: OrchestratorMessageId::from_string(row.get::<_, String>("id")?),
        session: SessionId::from_string(row.get::<_, String>("session_id")?),
        message_type: orchestrator_message_type_from_str(&row.get::<_, String>("message_type")?),
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        in_response_to: in_response_to.map(WorkerMessageId::from_string),
        created_at: row.get("created_at")?,
    })
}

impl Store {
    pub fn insert_worker_message(&self, msg: &WorkerMessage) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO worker_messages (id, session_id, message_type, payload, status, created_at, responded_at, response_payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                msg.id.as_str(),
                msg.session.as_str(),
                msg.message_type.to_string(),
                serde_json::to_string(&msg.payload)?,
                msg.status.to_string(),
                msg.created_at,
                msg.responded_at,
                msg.response_payload.as_ref().map(serde_json::to_string).transpose()?,
            ],
        )?;
        Ok(())
    }

    pub fn get_worker_message(&self, id: &WorkerMessageId) -> Result<Option<WorkerMessage>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM worker_messages WHERE id = ?1", params![id.as_str()], worker_message_from_row)
            .optional()
            .map_err(StoreError::from)
    }

    /// Pending response-required messages, oldest first. `session` filters
    /// to one session when given, matching `get_pending(session?)`.
    pub fn get_pending(&self, session: Option<&SessionId>) -> Result<Vec<WorkerMessage>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt;
        let rows = match session {
            Some(session) => {
                stmt = conn.prepare(
                    "SELECT * FROM worker_messages WHERE session_id = ?1 AND status = 'pending' ORDER BY created_at ASC",
                )?;
                stmt.query_map(params![session.as_str()], worker_message_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                stmt = conn
                    .prepare("SELECT * FROM worker_messages WHERE status = 'pending' ORDER BY created_at ASC")?;
                stmt.query_map([], worker_message_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// Mark a pending worker message responded and store the orchestrator's
    /// response atomically with the response row. Rejects duplicate
    /// responses and responses to non-response-required messages.
    pub fn respond_to_worker_message(
        &self,
        response: &OrchestratorMessage,
        response_payload: &serde_json::Value,
        now_millis: MillisSinceEpoch,
    ) -> Result<(), StoreError> {
        let worker_message_id = response
            .in_response_to
            .as_ref()
            .ok_or_else(|| StoreError::InvalidArgument("orchestrator message has no in_response_to".into()))?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let (status, message_type): (String, String) = tx
            .query_row(
                "SELECT status, message_type FROM worker_messages WHERE id = ?1",
                params![worker_message_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("worker message {worker_message_id}")))?;

        if !worker_message_type_from_str(&message_type).is_response_required() {
            return Err(StoreError::Conflict(format!("message {worker_message_id} is not response-required")));
        }
        if status != "pending" {
            return Err(StoreError::Conflict(format!("message {worker_message_id} already {status}")));
        }

        tx.execute(
            "UPDATE worker_messages SET status = 'responded', responded_at = ?1, response_payload = ?2 WHERE id = ?3",
            params![now_millis, serde_json::to_string(response_payload)?, worker_message_id.as_str()],
        )?;
        tx.execute(
            "INSERT INTO orchestrator_messages (id, session_id, message_type, payload, in_response_to, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                response.id.as_str(),
                response.session.as_str(),
                response.message_type.to_string(),
                serde_json::to_string(&response.payload)?,
                worker_message_id.as_str(),
                response.created_at,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Sweep pending response-required messages older than `ttl_millis` to
    /// `expired`, returning the ids that were swept.
    pub fn expire_stale_pending(
        &self,
        now_millis: MillisSinceEpoch,
        ttl_millis: i64,
    ) -> Result<Vec<WorkerMessageId>, StoreError> {
        let conn = self.conn.lock();
        let cutoff = now_millis - ttl_millis;
        let mut stmt =
            conn.prepare("SELECT id FROM worker_messages WHERE status = 'pending' AND created_at < ?1")?;
        let ids: Vec<String> = stmt.query_map(params![cutoff], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
        drop(stmt);
        conn.execute(
            "UPDATE worker_messages SET status = 'expired' WHERE status = 'pending' AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(ids.into_iter().map(WorkerMessageId::from_string).collect())
    }

    pub fn get_orchestrator_response_for(
        &self,
        worker_message_id: &WorkerMessageId,
    ) -> Result<Option<OrchestratorMessage>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM orchestrator_messages WHERE in_response_to = ?1",
            params![worker_message_id.as_str()],
            orchestrator_message_from_row,
        )
        .optional()
        .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsdh_core::test_support::sample_session;
    use serde_json::json;

    fn seeded_session(store: &Store) -> SessionId {
        let session = sample_session(1);
        store.insert_session(&session).unwrap();
        session.id
    }

    #[test]
    fn report_then_get_pending_returns_identical_payload() {
        let store = Store::open_in_memory().unwrap();
        let session = seeded_session(&store);
        let msg = WorkerMessage::new(
            session.clone(),
            WorkerMessageType::VerificationNeeded,
            json!({"phase": 1, "plan": 1}),
            0,
        );
        store.insert_worker_message(&msg).unwrap();

        let pending = store.get_pending(Some(&session)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, msg.payload);
    }

    #[test]
    fn respond_then_second_respond_fails_conflict() {
        let store = Store::open_in_memory().unwrap();
        let session = seeded_session(&store);
        let msg = WorkerMessage::new(session.clone(), WorkerMessageType::DecisionNeeded, json!({}), 0);
        store.insert_worker_message(&msg).unwrap();

        let response = OrchestratorMessage::new(
            session.clone(),
            OrchestratorMessageType::DecisionMade,
            json!({"ok": true}),
            Some(msg.id),
            10,
        );
        store.respond_to_worker_message(&response, &json!({"ok": true}), 10).unwrap();

        let fetched = store.get_worker_message(&msg.id).unwrap().unwrap();
        assert_eq!(fetched.status, WorkerMessageStatus::Responded);

        let second = OrchestratorMessage::new(
            session,
            OrchestratorMessageType::DecisionMade,
            json!({"ok": false}),
            Some(msg.id),
            20,
        );
        let err = store.respond_to_worker_message(&second, &json!({"ok": false}), 20);
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn respond_to_informational_message_rejected() {
        let store = Store::open_in_memory().unwrap();
        let session = seeded_session(&store);
        let msg = WorkerMessage::new(session.clone(), WorkerMessageType::TaskStarted, json!({}), 0);
        store.insert_worker_message(&msg).unwrap();

        let response = OrchestratorMessage::new(
            session,
            OrchestratorMessageType::DecisionMade,
            json!({}),
            Some(msg.id),
            10,
        );
        let err = store.respond_to_worker_message(&response, &json!({}), 10);
        assert!(matches!(err, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn expire_stale_pending_sweeps_past_ttl() {
        let store = Store::open_in_memory().unwrap();
        let session = seeded_session(&store);
        let msg = WorkerMessage::new(session, WorkerMessageType::ActionNeeded, json!({}), 0);
        store.insert_worker_message(&msg).unwrap();

        let expired = store.expire_stale_pending(100_000, 1_000).unwrap();
        assert_eq!(expired, vec![msg.id]);
        let fetched = store.get_worker_message(&msg.id).unwrap().unwrap();
        assert_eq!(fetched.status, WorkerMessageStatus::Expired);
    }
}
