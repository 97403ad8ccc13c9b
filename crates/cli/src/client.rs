// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin `reqwest` client wrapping the Tool-Call Endpoint for the CLI's
//! human-operator commands (§10.5). Mirrors the teacher's `DaemonClient`
//! split: one typed method per operation, JSON in, JSON out.

use gsdh_core::plan::Plan;
use gsdh_core::project_state::ProjectExecutionState;
use gsdh_core::session::Session;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("harness returned {status}: {body}")]
    Harness { status: u16, body: String },
}

pub struct HarnessClient {
    base_url: String,
    http: reqwest::Client,
}

impl HarnessClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: reqwest::Client::new() }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.http.get(format!("{}{path}", self.base_url)).send().await?;
        Self::into_json(resp).await
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, body: Value) -> Result<T, ClientError> {
        let resp = self.http.post(format!("{}{path}", self.base_url)).json(&body).send().await?;
        Self::into_json(resp).await
    }

    async fn into_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Harness { status: status.as_u16(), body });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Harness { status: status.as_u16(), body: e.to_string() })
    }

    pub async fn start_session(&self, working_dir: &str, command: &str, plan: Option<(u32, u32)>) -> Result<Value, ClientError> {
        let body = json!({
            "project": working_dir,
            "working_dir": working_dir,
            "command": command,
            "phase": plan.map(|p| p.0),
            "plan_number": plan.map(|p| p.1),
        });
        self.post("/api/sessions", body).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, ClientError> {
        self.get("/api/sessions").await
    }

    pub async fn end_session(&self, session: &str) -> Result<(), ClientError> {
        let resp = self.http.post(format!("{}/api/sessions/{session}/end", self.base_url)).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ClientError::Harness { status, body: resp.text().await? });
        }
        Ok(())
    }

    pub async fn get_checkpoint(&self, session: &str) -> Result<Value, ClientError> {
        self.get(&format!("/api/sessions/{session}/checkpoint")).await
    }

    pub async fn respond(&self, worker_message_id: &str, session: &str, response_type: &str, payload: Value) -> Result<(), ClientError> {
        let body = json!({ "session": session, "response_type": response_type, "payload": payload });
        let resp = self.http.post(format!("{}/api/messages/{worker_message_id}/respond", self.base_url)).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ClientError::Harness { status, body: resp.text().await? });
        }
        Ok(())
    }

    pub async fn get_project_state(&self, project: &str) -> Result<ProjectExecutionState, ClientError> {
        self.get(&format!("/api/projects/{project}/state")).await
    }

    pub async fn sync_project(&self, project: &str, project_root: &str) -> Result<Value, ClientError> {
        self.post(&format!("/api/projects/{project}/sync"), json!({ "project_root": project_root })).await
    }

    pub async fn list_plans(&self, project: &str) -> Result<Vec<Plan>, ClientError> {
        self.get(&format!("/api/projects/{project}/plans")).await
    }

    pub async fn complete_plan(&self, plan_id: &str) -> Result<(), ClientError> {
        let resp = self.http.post(format!("{}/api/plans/{plan_id}/complete", self.base_url)).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ClientError::Harness { status, body: resp.text().await? });
        }
        Ok(())
    }
}
