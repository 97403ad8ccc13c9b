// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gsdh_core::{ErrorKind, HarnessError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for HarnessError {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::Sqlite(_) | StoreError::Io(_) => ErrorKind::IoFailure,
            StoreError::Serde(_) => ErrorKind::InvalidArgument,
        };
        HarnessError::new(kind, err.to_string())
    }
}
