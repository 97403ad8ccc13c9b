// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level surface of the harness: the Event Bus, the Tool-Call Endpoint
//! (§4.8) and the dashboard push socket (§4.7, §6). `gsdh-daemon` assembles
//! an [`AppState`] from the lower crates and hands it to [`http::router`].

mod api;
mod bus;
mod dashboard;
mod error;
mod http;
mod state;

pub use bus::EventBus;
pub use error::WireError;
pub use http::router;
pub use state::{AppState, AWAIT_TIMEOUT_MILLIS_DEFAULT};

pub mod ops {
    //! Transport-agnostic operations, exposed for callers (e.g. the CLI's
    //! in-process `serve` mode, or tests) that want to drive the harness
    //! without going through HTTP.
    pub use crate::api::*;
}
