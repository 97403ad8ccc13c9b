// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gsdh_core::HarnessError;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error(transparent)]
    Scheduler(#[from] gsdh_scheduler::SchedulerError),

    #[error(transparent)]
    Store(#[from] gsdh_storage::StoreError),

    #[error(transparent)]
    Pty(#[from] gsdh_pty::PtyError),

    #[error(transparent)]
    ProtocolDir(#[from] gsdh_protocol_dir::ProtocolDirError),
}

impl From<WireError> for HarnessError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Scheduler(inner) => inner.into(),
            WireError::Store(inner) => inner.into(),
            WireError::Pty(inner) => inner.into(),
            WireError::ProtocolDir(inner) => inner.into(),
            WireError::NotFound(msg) => HarnessError::not_found(msg),
            WireError::InvalidArgument(msg) => HarnessError::invalid_argument(msg),
            WireError::Timeout(msg) => HarnessError::timeout(msg),
        }
    }
}
