// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use gsdh_core::clock::Clock;
use gsdh_pty::PtySupervisor;
use gsdh_scheduler::Scheduler;
use gsdh_storage::Store;

use crate::bus::EventBus;

/// Default `AWAIT_TIMEOUT` for `worker_await` and `wait_for_state_change`.
pub const AWAIT_TIMEOUT_MILLIS_DEFAULT: i64 = 10 * 60 * 1000;

const POLL_INTERVAL_MILLIS: u64 = 150;

/// Shared handle to every subsystem the Tool-Call Endpoint and dashboard
/// socket front. Cheap to clone: everything inside is already `Arc`-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub scheduler: Arc<Scheduler>,
    pub pty: Arc<PtySupervisor>,
    pub bus: Arc<EventBus>,
    pub clock: Arc<dyn Clock>,
    pub await_timeout_millis: i64,
}

impl AppState {
    pub fn new(store: Arc<Store>, scheduler: Arc<Scheduler>, pty: Arc<PtySupervisor>, bus: Arc<EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self { store, scheduler, pty, bus, clock, await_timeout_millis: AWAIT_TIMEOUT_MILLIS_DEFAULT }
    }

    pub(crate) fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(POLL_INTERVAL_MILLIS)
    }
}
