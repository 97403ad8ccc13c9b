// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable error taxonomy shared across every crate in the workspace.
//!
//! Every crate defines its own `thiserror` error enum for its internal
//! failure modes, then maps each variant onto one [`ErrorKind`] here via
//! `HarnessError::from`. The Tool-Call Endpoint serializes `HarnessError` as
//! `{"kind": "...", "message": "..."}` and nothing downstream of that
//! boundary needs to know which crate originated the failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionFailed,
    InvalidArgument,
    Timeout,
    IoFailure,
    ChildFailure,
    OrphanDetected,
}

crate::simple_display!(ErrorKind {
    NotFound => "not_found",
    Conflict => "conflict",
    PreconditionFailed => "precondition_failed",
    InvalidArgument => "invalid_argument",
    Timeout => "timeout",
    IoFailure => "io_failure",
    ChildFailure => "child_failure",
    OrphanDetected => "orphan_detected",
});

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct HarnessError {
    pub kind: ErrorKind,
    pub message: String,
}

impl HarnessError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoFailure, message)
    }

    pub fn child_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChildFailure, message)
    }

    pub fn orphan_detected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OrphanDetected, message)
    }
}

/// JSON envelope shape returned by the Tool-Call Endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&HarnessError> for ErrorEnvelope {
    fn from(err: &HarnessError) -> Self {
        Self { kind: err.kind, message: err.message.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PreconditionFailed).unwrap();
        assert_eq!(json, "\"precondition_failed\"");
    }

    #[test]
    fn envelope_round_trips() {
        let err = HarnessError::conflict("file already held");
        let envelope: ErrorEnvelope = (&err).into();
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"conflict\""));
        assert!(json.contains("file already held"));
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = HarnessError::timeout("checkpoint ack not received");
        assert_eq!(err.to_string(), "timeout: checkpoint ack not received");
    }
}
