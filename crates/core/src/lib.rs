// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gsdh-core: shared domain types for the orchestration harness.
//!
//! This crate has no I/O. It defines the data model of the harness (§3 of
//! the spec this crate implements): sessions, output chunks, the worker/
//! orchestrator message protocol, plans and project execution state, active
//! file holders, the typed event stream, and the stable error taxonomy (§7)
//! that every other crate maps its failures onto.

pub mod macros;

pub mod active_file;
pub mod checkpoint;
pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod output;
pub mod plan;
pub mod project_state;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use active_file::{ActiveFileEntry, FileMode};
pub use checkpoint::Checkpoint;
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ErrorKind, HarnessError};
pub use event::{Event, EventPublisher, NullEventPublisher, WaitKind};
pub use message::{
    OrchestratorMessage, OrchestratorMessageId, OrchestratorMessageType, WorkerMessage,
    WorkerMessageId, WorkerMessageStatus, WorkerMessageType,
};
pub use output::{OutputChunk, StreamTag};
pub use plan::{Plan, PlanId, PlanStatus, VerificationManifest, VerificationSpec};
pub use project_state::ProjectExecutionState;
pub use session::{Session, SessionId, SessionStatus, SlotId, N_SLOTS_DEFAULT};
