// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sessions: one per child process, bound to a slot for its whole lifetime.

use serde::{Deserialize, Serialize};

use crate::clock::MillisSinceEpoch;
use crate::define_id;

define_id! {
    /// Opaque session identifier.
    pub struct SessionId("ses-");
}

/// Default size of the fixed slot pool (`N_SLOTS` in the data model).
pub const N_SLOTS_DEFAULT: u32 = 4;

/// A slot number drawn from `{1..=N_SLOTS}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    WaitingCheckpoint,
    Completed,
    Failed,
}

crate::simple_display!(SessionStatus {
    Idle => "idle",
    Running => "running",
    WaitingCheckpoint => "waiting_checkpoint",
    Completed => "completed",
    Failed => "failed",
});

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Per §3: `pid` is present exactly when status is one of these.
    pub fn expects_pid(self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::WaitingCheckpoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub slot: SlotId,
    pub working_dir: String,
    pub command: String,
    pub pid: Option<u32>,
    pub status: SessionStatus,
    pub started_at: MillisSinceEpoch,
    pub ended_at: Option<MillisSinceEpoch>,
    pub last_polled_at: MillisSinceEpoch,
    /// Set when this session was rewritten to `failed` on recovery because its
    /// prior pid could not be reattached to.
    pub orphaned: bool,
    /// Latest cumulative usage figure reported alongside a `progress_update`
    /// message, if the worker reports one. Opaque to the harness; shape is
    /// whatever the worker puts under the message payload's `usage` key.
    pub usage: Option<serde_json::Value>,
}

impl Session {
    pub fn new(
        slot: SlotId,
        working_dir: impl Into<String>,
        command: impl Into<String>,
        now_millis: MillisSinceEpoch,
    ) -> Self {
        Self {
            id: SessionId::new(),
            slot,
            working_dir: working_dir.into(),
            command: command.into(),
            pid: None,
            status: SessionStatus::Idle,
            started_at: now_millis,
            ended_at: None,
            last_polled_at: now_millis,
            orphaned: false,
            usage: None,
        }
    }

    /// True when the session occupies a slot and is not yet done.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.status.expects_pid() != self.pid.is_some() {
            return Err(format!(
                "session {} has pid={:?} but status={}",
                self.id, self.pid, self.status
            ));
        }
        if self.status.is_terminal() != self.ended_at.is_some() {
            return Err(format!(
                "session {} has ended_at={:?} but status={}",
                self.id, self.ended_at, self.status
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_has_no_pid_and_is_idle() {
        let s = Session::new(SlotId(1), "/p", "echo hi", 0);
        assert_eq!(s.status, SessionStatus::Idle);
        assert!(s.pid.is_none());
        assert!(s.validate_invariants().is_ok());
    }

    #[test]
    fn running_without_pid_violates_invariant() {
        let mut s = Session::new(SlotId(1), "/p", "echo hi", 0);
        s.status = SessionStatus::Running;
        assert!(s.validate_invariants().is_err());
    }

    #[test]
    fn completed_without_ended_at_violates_invariant() {
        let mut s = Session::new(SlotId(1), "/p", "echo hi", 0);
        s.status = SessionStatus::Completed;
        assert!(s.validate_invariants().is_err());
        s.ended_at = Some(100);
        assert!(s.validate_invariants().is_ok());
    }
}
