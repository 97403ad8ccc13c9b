// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed admission-control rejections (§4.6, §4.8). These are normal
//! outcomes of `start_session`, not failures: a rejected start is reported to
//! the caller, not propagated as a [`crate::error::SchedulerError`].

use gsdh_core::plan::PlanId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StartRejection {
    /// No free execution slot (rule 5).
    SlotFull { n_slots: u32 },
    /// Starting this phase would run more than one phase ahead of the
    /// pending verification (rule 2).
    VerifyGate { pending_verify_phase: u32 },
    /// This phase falls outside the plan-lookahead window (rule 3).
    PlanLookahead { ceiling: u32 },
    /// One or more declared files are already held by another active plan
    /// in a conflicting mode (rule 4).
    FileConflict { paths: Vec<String> },
    /// A dependency of this plan has not yet reached `executed` (rule 1).
    DepsNotMet { missing: Vec<PlanId> },
}
