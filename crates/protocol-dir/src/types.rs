// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shapes of the files under `.orchestration/` (§6). These mirror the
//! Durable Store's view for human/tool inspection; they are never read back
//! as the source of truth except as a crash-recovery hint.

use gsdh_core::clock::MillisSinceEpoch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    pub version: u32,
    pub spec_dir: String,
    pub max_parallel_executions: u32,
    pub max_parallel_research: u32,
    pub verification_required: bool,
    pub auto_commit: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            version: 1,
            spec_dir: "specs".to_string(),
            max_parallel_executions: 4,
            max_parallel_research: 2,
            verification_required: true,
            auto_commit: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraphPlanView {
    pub plan_id: String,
    pub depends_on: Vec<String>,
    pub files_modified: Vec<String>,
    pub files_read: Vec<String>,
    pub autonomous: bool,
    pub checkpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraphView {
    pub timestamp: MillisSinceEpoch,
    pub spec_dir: String,
    pub plans: Vec<DependencyGraphPlanView>,
    pub completed: Vec<String>,
    pub running: Vec<String>,
    pub blocked: Vec<String>,
    pub available: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFileView {
    pub path: String,
    pub session: String,
    pub plan: String,
    pub op: String,
    pub started_at: MillisSinceEpoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFilesView {
    pub timestamp: MillisSinceEpoch,
    pub files: Vec<ActiveFileView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusFile {
    pub session: String,
    pub timestamp: MillisSinceEpoch,
    pub state: String,
    pub phase: Option<u32>,
    pub plan: Option<u32>,
    pub current_task: Option<u32>,
    pub total_tasks: Option<u32>,
    pub task_name: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub message_id: String,
    pub session: String,
    pub message_type: String,
    pub payload: serde_json::Value,
    pub created_at: MillisSinceEpoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointResponseFile {
    pub message_id: String,
    pub response_type: String,
    pub payload: serde_json::Value,
    pub responded_at: MillisSinceEpoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub session: String,
    pub status: String,
    pub exit_code: Option<i32>,
    pub ended_at: MillisSinceEpoch,
}
