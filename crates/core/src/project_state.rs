// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project Execution State: the scheduler's per-project summary (§3, §4.6).

use serde::{Deserialize, Serialize};

/// Default planning-ahead window (`PLAN_LOOKAHEAD`).
pub const PLAN_LOOKAHEAD_DEFAULT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectExecutionState {
    pub project: String,
    pub highest_executed: u32,
    pub highest_verified: u32,
    pub pending_verify_phase: Option<u32>,
    pub most_advanced_executing: Option<(u32, u32)>,
}

impl ProjectExecutionState {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            highest_executed: 0,
            highest_verified: 0,
            pending_verify_phase: None,
            most_advanced_executing: None,
        }
    }

    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.highest_verified > self.highest_executed {
            return Err(format!(
                "project {}: highest_verified ({}) > highest_executed ({})",
                self.project, self.highest_verified, self.highest_executed
            ));
        }
        Ok(())
    }

    /// Base phase used by the plan-lookahead rule (§4.6 rule 3).
    pub fn base_phase(&self) -> u32 {
        let executing_phase = self.most_advanced_executing.map(|(phase, _)| phase).unwrap_or(0);
        self.highest_executed.max(executing_phase)
    }

    /// Highest phase for which *planning* (creating future PLAN documents) is
    /// still permitted, per the plan-lookahead window.
    pub fn planning_ceiling(&self, plan_lookahead: u32) -> u32 {
        self.base_phase() + plan_lookahead
    }

    /// Whether starting execution of `phase` is permitted under the
    /// verification gate (rule 2): at most one phase may run ahead of the
    /// most recently verified-pending phase.
    pub fn passes_verify_gate(&self, phase: u32) -> bool {
        match self.pending_verify_phase {
            Some(verify_phase) => phase <= verify_phase + 1,
            None => true,
        }
    }

    pub fn record_phase_executed(&mut self, phase: u32, all_plans_in_phase_executed: bool) {
        if phase > self.highest_executed {
            self.highest_executed = phase;
        }
        if all_plans_in_phase_executed {
            self.pending_verify_phase = Some(phase);
        }
    }

    pub fn record_phase_verified(&mut self, phase: u32) {
        if phase > self.highest_verified {
            self.highest_verified = phase;
        }
        if self.pending_verify_phase == Some(phase) {
            self.pending_verify_phase = None;
        }
    }

    pub fn force_reset(&mut self) {
        self.highest_executed = 0;
        self.highest_verified = 0;
        self.pending_verify_phase = None;
        self.most_advanced_executing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_gate_allows_one_phase_ahead() {
        let mut state = ProjectExecutionState::new("/p");
        state.pending_verify_phase = Some(3);
        assert!(state.passes_verify_gate(4));
        assert!(!state.passes_verify_gate(5));
    }

    #[test]
    fn verify_gate_open_with_no_pending_phase() {
        let state = ProjectExecutionState::new("/p");
        assert!(state.passes_verify_gate(99));
    }

    #[test]
    fn planning_ceiling_uses_lookahead_window() {
        let mut state = ProjectExecutionState::new("/p");
        state.highest_executed = 2;
        assert_eq!(state.planning_ceiling(PLAN_LOOKAHEAD_DEFAULT), 7);
    }

    #[test]
    fn record_phase_verified_clears_pending_only_for_matching_phase() {
        let mut state = ProjectExecutionState::new("/p");
        state.pending_verify_phase = Some(3);
        state.record_phase_verified(2);
        assert_eq!(state.pending_verify_phase, Some(3));
        state.record_phase_verified(3);
        assert_eq!(state.pending_verify_phase, None);
        assert_eq!(state.highest_verified, 3);
    }

    #[test]
    fn invariant_rejects_verified_above_executed() {
        let mut state = ProjectExecutionState::new("/p");
        state.highest_verified = 5;
        state.highest_executed = 2;
        assert!(state.validate_invariants().is_err());
    }
}
