// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The typed event stream published by the Event Bus (§4.7).
//!
//! Events for one session are delivered to a subscriber in production
//! order; there is no ordering guarantee across sessions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::MillisSinceEpoch;
use crate::message::WorkerMessageId;
use crate::session::{SessionId, SlotId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitKind {
    Menu,
    Prompt,
    Permission,
    Continue,
    Unknown,
}

crate::simple_display!(WaitKind {
    Menu => "menu",
    Prompt => "prompt",
    Permission => "permission",
    Continue => "continue",
    Unknown => "unknown",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename = "session:started")]
    SessionStarted { session: SessionId, slot: SlotId, at: MillisSinceEpoch },

    #[serde(rename = "session:output")]
    SessionOutput { session: SessionId, data: String, at: MillisSinceEpoch },

    #[serde(rename = "session:waiting")]
    SessionWaiting {
        session: SessionId,
        kind: WaitKind,
        option_count: Option<u32>,
        trigger_snippet: String,
        intent: Option<WaitKind>,
        at: MillisSinceEpoch,
    },

    #[serde(rename = "session:checkpoint")]
    SessionCheckpoint { session: SessionId, message_id: WorkerMessageId, payload: Value, at: MillisSinceEpoch },

    #[serde(rename = "session:completed")]
    SessionCompleted { session: SessionId, exit_code: i32, at: MillisSinceEpoch },

    #[serde(rename = "session:failed")]
    SessionFailed { session: SessionId, reason: String, at: MillisSinceEpoch },

    #[serde(rename = "recovery:complete")]
    RecoveryComplete { orphaned_count: u32, recovered: Vec<RecoveredSession>, at: MillisSinceEpoch },
}

/// One session rewritten to `failed` by startup recovery, kept for operator
/// audit (§10.5) alongside the bare count in [`Event::RecoveryComplete`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveredSession {
    pub session: SessionId,
    pub prior_pid: Option<u32>,
}

impl Event {
    /// The session this event pertains to, if any (`recovery:complete` is
    /// global and has none). Used to route per-session ordering.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Event::SessionStarted { session, .. }
            | Event::SessionOutput { session, .. }
            | Event::SessionWaiting { session, .. }
            | Event::SessionCheckpoint { session, .. }
            | Event::SessionCompleted { session, .. }
            | Event::SessionFailed { session, .. } => Some(*session),
            Event::RecoveryComplete { .. } => None,
        }
    }
}

/// Sink for events produced by a subsystem (PTY Supervisor, Scheduler,
/// Message Channel). Implemented by the Event Bus; defined here so that
/// producers can depend on the trait without depending on the bus crate.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);
}

/// No-op sink for tests and tools that don't care about the event stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventPublisher;

impl EventPublisher for NullEventPublisher {
    fn publish(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_discriminant_tag() {
        let event = Event::SessionCompleted { session: SessionId::new(), exit_code: 0, at: 0 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session:completed");
        assert_eq!(json["exit_code"], 0);
    }

    #[test]
    fn recovery_complete_has_no_session() {
        let event = Event::RecoveryComplete { orphaned_count: 1, recovered: vec![], at: 0 };
        assert!(event.session().is_none());
    }
}
