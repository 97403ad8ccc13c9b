// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gsdh_core::{ErrorKind, HarnessError};
use gsdh_protocol_dir::ProtocolDirError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("io error at {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("store error: {0}")]
    Store(#[from] gsdh_storage::StoreError),

    #[error("pty error: {0}")]
    Pty(#[from] gsdh_pty::PtyError),

    #[error("protocol directory error: {0}")]
    ProtocolDir(#[from] ProtocolDirError),
}

impl From<SchedulerError> for HarnessError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Store(inner) => inner.into(),
            SchedulerError::Pty(inner) => inner.into(),
            other => {
                let kind = match &other {
                    SchedulerError::NotFound(_) => ErrorKind::NotFound,
                    SchedulerError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
                    SchedulerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                    SchedulerError::Io { .. } => ErrorKind::IoFailure,
                    SchedulerError::ProtocolDir(_) => ErrorKind::InvalidArgument,
                    SchedulerError::Store(_) | SchedulerError::Pty(_) => unreachable!(),
                };
                HarnessError::new(kind, other.to_string())
            }
        }
    }
}
