// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gsdh_core::session::SessionId;
use gsdh_core::{ErrorKind, HarnessError};

#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("no free slot among {0} slots")]
    SlotFull(u32),

    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("resize failed: {0}")]
    ResizeFailed(String),

    #[error("store error: {0}")]
    Store(#[from] gsdh_storage::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PtyError> for HarnessError {
    fn from(err: PtyError) -> Self {
        match err {
            PtyError::Store(inner) => inner.into(),
            other => {
                let kind = match &other {
                    PtyError::NotFound(_) => ErrorKind::NotFound,
                    PtyError::SlotFull(_) => ErrorKind::Conflict,
                    PtyError::SpawnFailed(_) => ErrorKind::ChildFailure,
                    PtyError::WriteFailed(_) | PtyError::ResizeFailed(_) => ErrorKind::IoFailure,
                    PtyError::Io(_) => ErrorKind::IoFailure,
                    PtyError::Store(_) => unreachable!(),
                };
                HarnessError::new(kind, other.to_string())
            }
        }
    }
}
