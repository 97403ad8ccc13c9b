// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker/orchestrator message protocol (§3, §4.4).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::MillisSinceEpoch;
use crate::define_id;
use crate::session::SessionId;

define_id! {
    /// Opaque worker-message identifier.
    pub struct WorkerMessageId("wmg-");
}

define_id! {
    /// Opaque orchestrator-message identifier.
    pub struct OrchestratorMessageId("omg-");
}

/// Default time-to-live for a pending response-required worker message.
pub const MESSAGE_TTL_DEFAULT_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerMessageType {
    // Informational: settle immediately, never transition to `responded`.
    SessionReady,
    TaskStarted,
    ProgressUpdate,
    TaskCompleted,
    TaskFailed,
    // Response-required: may transition `pending -> responded` or `expired`.
    VerificationNeeded,
    DecisionNeeded,
    ActionNeeded,
    CredentialsNeeded,
}

crate::simple_display!(WorkerMessageType {
    SessionReady => "session_ready",
    TaskStarted => "task_started",
    ProgressUpdate => "progress_update",
    TaskCompleted => "task_completed",
    TaskFailed => "task_failed",
    VerificationNeeded => "verification_needed",
    DecisionNeeded => "decision_needed",
    ActionNeeded => "action_needed",
    CredentialsNeeded => "credentials_needed",
});

impl WorkerMessageType {
    pub fn is_response_required(self) -> bool {
        matches!(
            self,
            WorkerMessageType::VerificationNeeded
                | WorkerMessageType::DecisionNeeded
                | WorkerMessageType::ActionNeeded
                | WorkerMessageType::CredentialsNeeded
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerMessageStatus {
    Pending,
    Responded,
    Expired,
}

crate::simple_display!(WorkerMessageStatus {
    Pending => "pending",
    Responded => "responded",
    Expired => "expired",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerMessage {
    pub id: WorkerMessageId,
    pub session: SessionId,
    pub message_type: WorkerMessageType,
    pub payload: Value,
    pub status: WorkerMessageStatus,
    pub created_at: MillisSinceEpoch,
    pub responded_at: Option<MillisSinceEpoch>,
    pub response_payload: Option<Value>,
}

impl WorkerMessage {
    pub fn new(
        session: SessionId,
        message_type: WorkerMessageType,
        payload: Value,
        now_millis: MillisSinceEpoch,
    ) -> Self {
        // Informational types settle immediately: they are never `pending`
        // in the sense of awaiting a response, but they still occupy a row
        // so `get_pending` and history queries see a consistent record.
        let status = if message_type.is_response_required() {
            WorkerMessageStatus::Pending
        } else {
            WorkerMessageStatus::Responded
        };
        Self {
            id: WorkerMessageId::new(),
            session,
            message_type,
            payload,
            status,
            created_at: now_millis,
            responded_at: if status == WorkerMessageStatus::Responded { Some(now_millis) } else { None },
            response_payload: None,
        }
    }

    pub fn is_awaitable_pending(&self) -> bool {
        self.message_type.is_response_required() && self.status == WorkerMessageStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorMessageType {
    AssignTask,
    VerificationResult,
    DecisionMade,
    ActionCompleted,
    CredentialsProvided,
    AbortTask,
}

crate::simple_display!(OrchestratorMessageType {
    AssignTask => "assign_task",
    VerificationResult => "verification_result",
    DecisionMade => "decision_made",
    ActionCompleted => "action_completed",
    CredentialsProvided => "credentials_provided",
    AbortTask => "abort_task",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorMessage {
    pub id: OrchestratorMessageId,
    pub session: SessionId,
    pub message_type: OrchestratorMessageType,
    pub payload: Value,
    pub in_response_to: Option<WorkerMessageId>,
    pub created_at: MillisSinceEpoch,
}

impl OrchestratorMessage {
    pub fn new(
        session: SessionId,
        message_type: OrchestratorMessageType,
        payload: Value,
        in_response_to: Option<WorkerMessageId>,
        now_millis: MillisSinceEpoch,
    ) -> Self {
        Self { id: OrchestratorMessageId::new(), session, message_type, payload, in_response_to, created_at: now_millis }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn informational_message_settles_immediately() {
        let msg = WorkerMessage::new(SessionId::new(), WorkerMessageType::TaskStarted, json!({}), 0);
        assert_eq!(msg.status, WorkerMessageStatus::Responded);
        assert!(!msg.is_awaitable_pending());
    }

    #[test]
    fn response_required_message_starts_pending() {
        let msg = WorkerMessage::new(SessionId::new(), WorkerMessageType::VerificationNeeded, json!({}), 0);
        assert_eq!(msg.status, WorkerMessageStatus::Pending);
        assert!(msg.is_awaitable_pending());
    }

    #[test]
    fn display_matches_wire_strings() {
        assert_eq!(WorkerMessageType::CredentialsNeeded.to_string(), "credentials_needed");
        assert_eq!(OrchestratorMessageType::CredentialsProvided.to_string(), "credentials_provided");
    }
}
