// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gsdh-protocol-dir: the Protocol Directory (§4.5, §6).
//!
//! A filesystem mirror under `.orchestration/` in the controlled project
//! root, plus parsing of Plan Documents and `ROADMAP.md` front matter. The
//! mirror is a read replica and crash-recovery hint; the Durable Store is
//! authoritative. On disagreement, the store wins and the directory is
//! regenerated.

mod error;
mod mirror;
pub mod plan_doc;
pub mod types;

pub use error::ProtocolDirError;
pub use mirror::ProtocolDir;
