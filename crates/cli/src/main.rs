// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gsdh`: the harness CLI. `gsdh serve` runs the daemon in the foreground;
//! every other subcommand is a thin client over the Tool-Call Endpoint for
//! human operators.

mod client;

use clap::{Parser, Subcommand};
use client::HarnessClient;
use gsdh_daemon::{Config, ConfigOverrides, Harness};
use serde_json::json;

/// Build metadata embedded by `build.rs`.
const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Parser)]
#[command(name = "gsdh", version = PROTOCOL_VERSION)]
struct Cli {
    /// Base URL of a running harness, for every subcommand but `serve`.
    #[arg(long, global = true, default_value = "http://127.0.0.1:3333")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the harness daemon in the foreground.
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        credentials_dir: Option<std::path::PathBuf>,
    },
    /// Session management.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Checkpoint inspection and response.
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },
    /// Project execution state.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Plan inspection and completion.
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    Start {
        working_dir: String,
        command: String,
        #[arg(long)]
        phase: Option<u32>,
        #[arg(long)]
        plan: Option<u32>,
    },
    List,
    End {
        session: String,
    },
}

#[derive(Subcommand)]
enum CheckpointAction {
    Show { session: String },
    Respond { worker_message_id: String, session: String, response_type: String, payload: String },
}

#[derive(Subcommand)]
enum ProjectAction {
    Status { project: String },
    /// Rescan the project's Plan Documents and reconcile them into the store.
    Sync { project: String, project_root: String },
}

#[derive(Subcommand)]
enum PlanAction {
    List { project: String },
    Complete { plan_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, credentials_dir } => {
            let state_dir = gsdh_daemon::state_dir()?;
            let _log_guard = gsdh_daemon::logging::init(&state_dir)?;
            let overrides = ConfigOverrides { port, credentials_dir };
            let config = Config::load(None, overrides)?;
            let harness = Harness::start(&state_dir, config)?;
            harness.serve().await?;
        }
        Command::Session { action } => run_session(&cli.url, action).await?,
        Command::Checkpoint { action } => run_checkpoint(&cli.url, action).await?,
        Command::Project { action } => run_project(&cli.url, action).await?,
        Command::Plan { action } => run_plan(&cli.url, action).await?,
    }

    Ok(())
}

async fn run_session(url: &str, action: SessionAction) -> anyhow::Result<()> {
    let client = HarnessClient::new(url);
    match action {
        SessionAction::Start { working_dir, command, phase, plan } => {
            let plan = phase.zip(plan);
            let result = client.start_session(&working_dir, &command, plan).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        SessionAction::List => {
            let sessions = client.list_sessions().await?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        SessionAction::End { session } => {
            client.end_session(&session).await?;
            println!("session {session} ended");
        }
    }
    Ok(())
}

async fn run_checkpoint(url: &str, action: CheckpointAction) -> anyhow::Result<()> {
    let client = HarnessClient::new(url);
    match action {
        CheckpointAction::Show { session } => {
            let checkpoint = client.get_checkpoint(&session).await?;
            println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        }
        CheckpointAction::Respond { worker_message_id, session, response_type, payload } => {
            let payload: serde_json::Value = serde_json::from_str(&payload).unwrap_or_else(|_| json!({ "text": payload }));
            client.respond(&worker_message_id, &session, &response_type, payload).await?;
            println!("responded to {worker_message_id}");
        }
    }
    Ok(())
}

async fn run_project(url: &str, action: ProjectAction) -> anyhow::Result<()> {
    let client = HarnessClient::new(url);
    match action {
        ProjectAction::Status { project } => {
            let state = client.get_project_state(&project).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        ProjectAction::Sync { project, project_root } => {
            let result = client.sync_project(&project, &project_root).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

async fn run_plan(url: &str, action: PlanAction) -> anyhow::Result<()> {
    let client = HarnessClient::new(url);
    match action {
        PlanAction::List { project } => {
            let plans = client.list_plans(&project).await?;
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
        PlanAction::Complete { plan_id } => {
            client.complete_plan(&plan_id).await?;
            println!("plan {plan_id} completed");
        }
    }
    Ok(())
}
