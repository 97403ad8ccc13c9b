// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logging setup (§10.1): an `EnvFilter` layer honoring
//! `RUST_LOG`, plus a rolling file appender under the state directory so
//! operators can inspect history after a crash.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. The returned [`WorkerGuard`] must be kept
/// alive for the process lifetime, or buffered log lines are dropped on the
/// non-blocking appender's internal channel at shutdown.
pub fn init(state_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(state_dir)?;
    let file_appender = tracing_appender::rolling::never(state_dir, "harness.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();

    Ok(guard)
}
