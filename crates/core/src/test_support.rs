// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and fakes shared by other crates' test suites. Gated behind the
//! `test-support` feature so it never ships in a release build.

use serde_json::json;

use crate::clock::{Clock, FakeClock, MillisSinceEpoch};
use crate::message::{WorkerMessage, WorkerMessageType};
use crate::plan::Plan;
use crate::session::{Session, SessionId, SlotId};

/// A `FakeClock` starting at a fixed, memorable instant so test output is
/// reproducible across runs.
pub fn fixed_clock() -> FakeClock {
    FakeClock::new(1_700_000_000_000)
}

pub fn sample_session(slot: u32) -> Session {
    Session::new(SlotId(slot), "/tmp/project", "echo hello; exit 0", 0)
}

pub fn sample_plan(project: &str, phase: u32, plan_number: u32) -> Plan {
    Plan::new(project, phase, plan_number)
}

pub fn sample_worker_message(session: SessionId, message_type: WorkerMessageType, at: MillisSinceEpoch) -> WorkerMessage {
    WorkerMessage::new(session, message_type, json!({"sample": true}), at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_deterministic_across_calls() {
        assert_eq!(fixed_clock().now_millis(), fixed_clock().now_millis());
    }

    #[test]
    fn sample_session_is_idle() {
        let s = sample_session(1);
        assert_eq!(s.slot.0, 1);
    }
}
