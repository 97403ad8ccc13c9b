// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plans: the unit of schedulable work, identified by `(phase, plan)`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// Opaque plan identifier (distinct from the human-facing `(phase, plan)` pair).
    pub struct PlanId("pln-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanStatus(PlanStatusInner);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PlanStatusInner {
    Planned,
    Executing,
    Executed,
    Verified,
}

impl PlanStatus {
    pub const PLANNED: PlanStatus = PlanStatus(PlanStatusInner::Planned);
    pub const EXECUTING: PlanStatus = PlanStatus(PlanStatusInner::Executing);
    pub const EXECUTED: PlanStatus = PlanStatus(PlanStatusInner::Executed);
    pub const VERIFIED: PlanStatus = PlanStatus(PlanStatusInner::Verified);

    /// Whether `self -> next` is a legal forward transition in the plan
    /// state machine (`planned -> executing -> executed -> verified`).
    pub fn can_advance_to(self, next: PlanStatus) -> bool {
        use PlanStatusInner::*;
        matches!(
            (self.0, next.0),
            (Planned, Executing) | (Executing, Executed) | (Executed, Verified)
        )
    }

    pub fn is_verified(self) -> bool {
        self.0 == PlanStatusInner::Verified
    }

    pub fn is_executed_or_verified(self) -> bool {
        matches!(self.0, PlanStatusInner::Executed | PlanStatusInner::Verified)
    }
}

crate::simple_display!(PlanStatus {
    PLANNED => "planned",
    EXECUTING => "executing",
    EXECUTED => "executed",
    VERIFIED => "verified",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerificationSpec {
    /// Opaque identifier of the check, interpreted by an external verification backend.
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationManifest {
    pub must_pass: Vec<VerificationSpec>,
    #[serde(default)]
    pub should_pass: Vec<VerificationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub project: String,
    pub phase: u32,
    pub plan_number: u32,
    pub status: PlanStatus,
    pub depends_on: BTreeSet<PlanId>,
    pub files_written: BTreeSet<String>,
    pub files_read: BTreeSet<String>,
    pub autonomous: bool,
    pub verification: VerificationManifest,
}

impl Plan {
    pub fn new(project: impl Into<String>, phase: u32, plan_number: u32) -> Self {
        Self {
            id: PlanId::new(),
            project: project.into(),
            phase,
            plan_number,
            status: PlanStatus::PLANNED,
            depends_on: BTreeSet::new(),
            files_written: BTreeSet::new(),
            files_read: BTreeSet::new(),
            autonomous: false,
            verification: VerificationManifest::default(),
        }
    }

    crate::setters! {
        set {
            depends_on: BTreeSet<PlanId>,
            files_written: BTreeSet<String>,
            files_read: BTreeSet<String>,
            autonomous: bool,
            verification: VerificationManifest
        }
    }

    pub fn key(&self) -> (u32, u32) {
        (self.phase, self.plan_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(PlanStatus::PLANNED.can_advance_to(PlanStatus::EXECUTING));
        assert!(PlanStatus::EXECUTING.can_advance_to(PlanStatus::EXECUTED));
        assert!(PlanStatus::EXECUTED.can_advance_to(PlanStatus::VERIFIED));
    }

    #[test]
    fn skipping_a_state_is_illegal() {
        assert!(!PlanStatus::PLANNED.can_advance_to(PlanStatus::EXECUTED));
        assert!(!PlanStatus::EXECUTING.can_advance_to(PlanStatus::VERIFIED));
    }

    #[test]
    fn verified_is_terminal_upward() {
        assert!(!PlanStatus::VERIFIED.can_advance_to(PlanStatus::PLANNED));
        assert!(!PlanStatus::VERIFIED.can_advance_to(PlanStatus::EXECUTING));
    }

    #[test]
    fn plan_key_orders_by_phase_then_number() {
        let a = Plan::new("/p", 1, 2);
        let b = Plan::new("/p", 1, 3);
        assert!(a.key() < b.key());
    }
}
