// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk mirror under `.orchestration/` (§4.5, §6). Files are
//! overwritten whole on each update; nothing here is read back as the
//! authoritative source of truth, so a torn write is recoverable by simply
//! regenerating from the store on next sync.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ProtocolDirError;
use crate::types::{ActiveFilesView, CheckpointFile, CheckpointResponseFile, DependencyGraphView, OrchestrationConfig, ResultFile, SessionStatusFile};

pub struct ProtocolDir {
    root: PathBuf,
}

impl ProtocolDir {
    /// `project_root` is the controlled project path; the mirror itself
    /// lives under `<project_root>/.orchestration/`.
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self { root: project_root.as_ref().join(".orchestration") }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session: &str) -> PathBuf {
        self.root.join("sessions").join(session)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), ProtocolDirError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ProtocolDirError::Io { path: parent.display().to_string(), source })?;
        }
        let json = serde_json::to_string_pretty(value)
            .map_err(|source| ProtocolDirError::Json { path: path.display().to_string(), source })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| ProtocolDirError::Io { path: tmp.display().to_string(), source })?;
        std::fs::rename(&tmp, path).map_err(|source| ProtocolDirError::Io { path: path.display().to_string(), source })
    }

    pub fn write_config(&self, config: &OrchestrationConfig) -> Result<(), ProtocolDirError> {
        let path = self.root.join("config.yaml");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ProtocolDirError::Io { path: parent.display().to_string(), source })?;
        }
        let yaml = serde_yaml::to_string(config)
            .map_err(|source| ProtocolDirError::FrontMatter { path: path.display().to_string(), source })?;
        let tmp = path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(|source| ProtocolDirError::Io { path: tmp.display().to_string(), source })?;
        std::fs::rename(&tmp, &path).map_err(|source| ProtocolDirError::Io { path: path.display().to_string(), source })
    }

    pub fn write_dependency_graph(&self, view: &DependencyGraphView) -> Result<(), ProtocolDirError> {
        self.write_json(&self.root.join("dependency-graph.json"), view)
    }

    pub fn write_active_files(&self, view: &ActiveFilesView) -> Result<(), ProtocolDirError> {
        self.write_json(&self.root.join("active-files.json"), view)
    }

    pub fn write_session_status(&self, session: &str, status: &SessionStatusFile) -> Result<(), ProtocolDirError> {
        self.write_json(&self.session_dir(session).join("status.json"), status)
    }

    pub fn write_checkpoint(&self, session: &str, checkpoint: &CheckpointFile) -> Result<(), ProtocolDirError> {
        self.write_json(&self.session_dir(session).join("checkpoint.json"), checkpoint)
    }

    pub fn write_checkpoint_response(
        &self,
        session: &str,
        response: &CheckpointResponseFile,
    ) -> Result<(), ProtocolDirError> {
        self.write_json(&self.session_dir(session).join("checkpoint_response.json"), response)
    }

    pub fn write_result(&self, session: &str, result: &ResultFile) -> Result<(), ProtocolDirError> {
        self.write_json(&self.session_dir(session).join("result.json"), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyGraphPlanView;

    #[test]
    fn write_dependency_graph_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = ProtocolDir::new(dir.path());
        let view = DependencyGraphView {
            timestamp: 0,
            spec_dir: "specs".into(),
            plans: vec![DependencyGraphPlanView {
                plan_id: "p1".into(),
                depends_on: vec![],
                files_modified: vec!["a.ts".into()],
                files_read: vec![],
                autonomous: false,
                checkpoints: vec![],
            }],
            completed: vec![],
            running: vec![],
            blocked: vec![],
            available: vec!["p1".into()],
        };
        mirror.write_dependency_graph(&view).unwrap();

        let raw = std::fs::read_to_string(mirror.root().join("dependency-graph.json")).unwrap();
        let parsed: DependencyGraphView = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.plans.len(), 1);
        assert_eq!(parsed.available, vec!["p1".to_string()]);
    }

    #[test]
    fn write_config_produces_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = ProtocolDir::new(dir.path());
        mirror.write_config(&OrchestrationConfig::default()).unwrap();
        let raw = std::fs::read_to_string(mirror.root().join("config.yaml")).unwrap();
        assert!(raw.contains("verification_required"));
    }

    #[test]
    fn session_files_nest_under_session_id() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = ProtocolDir::new(dir.path());
        mirror
            .write_session_status(
                "ses-abc",
                &SessionStatusFile {
                    session: "ses-abc".into(),
                    timestamp: 0,
                    state: "running".into(),
                    phase: Some(1),
                    plan: Some(1),
                    current_task: None,
                    total_tasks: None,
                    task_name: None,
                    message: None,
                },
            )
            .unwrap();
        assert!(mirror.root().join("sessions/ses-abc/status.json").is_file());
    }
}
