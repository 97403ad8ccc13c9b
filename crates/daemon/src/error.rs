// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use gsdh_pty::PtyError;
use gsdh_scheduler::SchedulerError;
use gsdh_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("io error at {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pty(#[from] PtyError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
