// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gsdh_core::{ErrorKind, HarnessError};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolDirError {
    #[error("io error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("malformed front matter in {path}: {source}")]
    FrontMatter { path: String, #[source] source: serde_yaml::Error },

    #[error("malformed json in {path}: {source}")]
    Json { path: String, #[source] source: serde_json::Error },

    #[error("{0} not found")]
    NotFound(String),
}

impl From<ProtocolDirError> for HarnessError {
    fn from(err: ProtocolDirError) -> Self {
        let kind = match &err {
            ProtocolDirError::NotFound(_) => ErrorKind::NotFound,
            ProtocolDirError::FrontMatter { .. } | ProtocolDirError::Json { .. } => ErrorKind::InvalidArgument,
            ProtocolDirError::Io { .. } => ErrorKind::IoFailure,
        };
        HarnessError::new(kind, err.to_string())
    }
}
