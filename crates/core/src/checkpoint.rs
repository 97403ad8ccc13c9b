// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint: the logical view of a pending response-required worker
//! message, surfaced to the orchestrator client as the current blocking
//! question for a session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::MillisSinceEpoch;
use crate::message::{WorkerMessage, WorkerMessageId, WorkerMessageType};
use crate::session::SessionId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub message_id: WorkerMessageId,
    pub session: SessionId,
    pub message_type: WorkerMessageType,
    pub payload: Value,
    pub created_at: MillisSinceEpoch,
}

impl Checkpoint {
    /// Build a checkpoint view from a worker message, or `None` if the
    /// message isn't a pending response-required one.
    pub fn from_worker_message(msg: &WorkerMessage) -> Option<Self> {
        if !msg.is_awaitable_pending() {
            return None;
        }
        Some(Self {
            message_id: msg.id,
            session: msg.session,
            message_type: msg.message_type,
            payload: msg.payload.clone(),
            created_at: msg.created_at,
        })
    }

    /// Pick the "current" checkpoint among a session's pending
    /// response-required messages: the oldest by creation time (§4.4).
    pub fn current<'a>(pending: impl IntoIterator<Item = &'a WorkerMessage>) -> Option<Checkpoint> {
        pending
            .into_iter()
            .filter(|m| m.is_awaitable_pending())
            .min_by_key(|m| m.created_at)
            .and_then(Checkpoint::from_worker_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::WorkerMessageType;
    use serde_json::json;

    #[test]
    fn informational_message_yields_no_checkpoint() {
        let msg = WorkerMessage::new(SessionId::new(), WorkerMessageType::TaskStarted, json!({}), 0);
        assert!(Checkpoint::from_worker_message(&msg).is_none());
    }

    #[test]
    fn current_picks_oldest_pending() {
        let session = SessionId::new();
        let older = WorkerMessage::new(session, WorkerMessageType::DecisionNeeded, json!({"n": 1}), 10);
        let newer = WorkerMessage::new(session, WorkerMessageType::DecisionNeeded, json!({"n": 2}), 20);
        let current = Checkpoint::current([&newer, &older]).unwrap();
        assert_eq!(current.created_at, 10);
    }
}
