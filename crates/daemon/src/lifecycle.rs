// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wires the Durable Store, PTY Supervisor,
//! Scheduler and Event Bus together, runs crash recovery, and hands the
//! assembled [`AppState`] to the HTTP router. Shutdown drains in-flight
//! connections before the process exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gsdh_core::clock::{Clock, SystemClock};
use gsdh_core::event::EventPublisher;
use gsdh_pty::PtySupervisor;
use gsdh_scheduler::Scheduler;
use gsdh_storage::Store;
use gsdh_wire::{AppState, EventBus};

use crate::config::Config;
use crate::error::DaemonError;

/// Interval between maintenance sweeps: `SESSION_TIMEOUT` enforcement (§4.2)
/// and stale pending-message expiry (§4.4).
pub const MAINTENANCE_INTERVAL_MILLIS_DEFAULT: u64 = 30_000;

/// Resolves the harness's state directory (state files, the sqlite
/// database, logs, and the default credentials directory all live under
/// here): `GSDH_STATE_DIR` if set, else the platform state directory, else
/// `~/.local/state/gsdh`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("GSDH_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("gsdh"));
    }
    let home = dirs::home_dir().ok_or_else(|| DaemonError::InvalidConfig("no home directory".into()))?;
    Ok(home.join(".local/state/gsdh"))
}

/// Everything the daemon binary needs to run: the assembled `AppState` plus
/// the config it was built from.
pub struct Harness {
    pub state: AppState,
    pub config: Config,
}

impl Harness {
    /// Opens (creating if absent) the sqlite database under `state_dir`,
    /// wires the PTY Supervisor and Scheduler on top of it, then runs
    /// startup recovery for any session left non-terminal by a prior
    /// instance (§4.2).
    pub fn start(state_dir: &Path, config: Config) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(state_dir)
            .map_err(|source| DaemonError::Io { path: state_dir.display().to_string(), source })?;
        let db_path = state_dir.join("harness.sqlite3");

        let store = Arc::new(Store::open(&db_path)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = Arc::new(EventBus::new());
        bus.spawn_recovery_listener();

        let events: Arc<dyn EventPublisher> = bus.clone();
        let pty = Arc::new(PtySupervisor::with_slots(store.clone(), events, clock.clone(), config.n_slots));
        let scheduler = Arc::new(Scheduler::with_lookahead(
            store.clone(),
            pty.clone(),
            clock.clone(),
            config.plan_lookahead,
        ));

        let recovered = pty.recover_orphans()?;
        if recovered > 0 {
            tracing::warn!(recovered, "startup recovery rewrote non-terminal sessions to failed");
        }

        spawn_maintenance_sweep(
            store.clone(),
            pty.clone(),
            clock.clone(),
            config.session_timeout_millis,
            config.message_ttl_secs as i64 * 1000,
        );

        let mut state = AppState::new(store, scheduler, pty, bus, clock);
        state.await_timeout_millis = config.await_timeout_millis;

        Ok(Self { state, config })
    }

    /// Serves the Tool-Call Endpoint and dashboard socket on
    /// `config.port` until the process receives a shutdown signal.
    pub async fn serve(self) -> Result<(), DaemonError> {
        let router = gsdh_wire::router(self.state);
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| DaemonError::Io { path: addr.clone(), source })?;
        tracing::info!(addr, "harness listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| DaemonError::Io { path: addr, source })
    }
}

/// Periodic background pass enforcing `SESSION_TIMEOUT` (§4.2) and
/// `MESSAGE_TTL` (§4.4). Runs detached for the lifetime of the process;
/// there is no graceful-shutdown coordination with it since each tick is a
/// self-contained, idempotent sweep.
fn spawn_maintenance_sweep(
    store: Arc<Store>,
    pty: Arc<PtySupervisor>,
    clock: Arc<dyn Clock>,
    session_timeout_millis: i64,
    message_ttl_millis: i64,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(MAINTENANCE_INTERVAL_MILLIS_DEFAULT));
        loop {
            ticker.tick().await;

            match pty.sweep_timeouts(session_timeout_millis) {
                Ok(swept) if swept > 0 => tracing::info!(swept, "maintenance sweep timed out unresponsive sessions"),
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "session timeout sweep failed"),
            }

            match store.expire_stale_pending(clock.now_millis(), message_ttl_millis) {
                Ok(expired) if !expired.is_empty() => {
                    tracing::info!(count = expired.len(), "maintenance sweep expired stale pending messages")
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "stale pending message sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install sigterm handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining");
}
