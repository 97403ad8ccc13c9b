// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sync_state` (§4.8): rescans a project's Plan Documents on disk and
//! reconciles them into the Durable Store under the downgrade rules of
//! §4.6 — `verified` is terminal upward, and an ordinary sync never
//! downgrades an already-`executed` plan just because its summary file
//! went missing.

use std::path::Path;

use gsdh_core::plan::{Plan, PlanStatus};
use gsdh_protocol_dir::plan_doc::{parse_plan_document, phase_has_verification_marker, PlanFrontMatter};
use gsdh_storage::Store;

use crate::error::SchedulerError;

/// A discovered Plan Document: its front matter plus the phase directory it
/// lives under, needed to check for a verification marker.
struct Discovered {
    front: PlanFrontMatter,
    phase: u32,
    plan_number: u32,
}

/// Plan Documents live at `<project_root>/specs/phase-<NN>/<NN>-<MM>-PLAN.md`.
fn discover_plan_documents(project_root: &Path) -> Result<Vec<Discovered>, SchedulerError> {
    let specs_dir = project_root.join("specs");
    let mut found = Vec::new();
    if !specs_dir.is_dir() {
        return Ok(found);
    }

    let phase_dirs = std::fs::read_dir(&specs_dir)
        .map_err(|source| SchedulerError::Io { path: specs_dir.display().to_string(), source })?;
    for phase_entry in phase_dirs {
        let phase_entry =
            phase_entry.map_err(|source| SchedulerError::Io { path: specs_dir.display().to_string(), source })?;
        let phase_dir = phase_entry.path();
        if !phase_dir.is_dir() {
            continue;
        }
        let Some(phase) = phase_number(&phase_dir) else { continue };

        let files = std::fs::read_dir(&phase_dir)
            .map_err(|source| SchedulerError::Io { path: phase_dir.display().to_string(), source })?;
        for file_entry in files {
            let file_entry =
                file_entry.map_err(|source| SchedulerError::Io { path: phase_dir.display().to_string(), source })?;
            let path = file_entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if !name.ends_with("-PLAN.md") {
                continue;
            }
            let contents = std::fs::read_to_string(&path)
                .map_err(|source| SchedulerError::Io { path: path.display().to_string(), source })?;
            let front = parse_plan_document(&path, &contents)?;
            let Some(plan_number) = plan_number_from_slug(&front.plan_id) else { continue };
            found.push(Discovered { front, phase, plan_number });
        }
    }
    Ok(found)
}

fn phase_number(phase_dir: &Path) -> Option<u32> {
    phase_dir.file_name()?.to_str()?.strip_prefix("phase-")?.parse().ok()
}

/// `plan_id` slugs are `"<phase>-<plan_number>"`, e.g. `"01-02"`.
fn plan_number_from_slug(slug: &str) -> Option<u32> {
    slug.rsplit('-').next()?.parse().ok()
}

/// Runs `sync_state` for one project. Returns the number of plans touched.
pub fn sync_state(store: &Store, project_root: &Path, project: &str) -> Result<u32, SchedulerError> {
    let discovered = discover_plan_documents(project_root)?;

    // Resolve `depends_on` slugs to PlanIds in a second pass, once every
    // plan in this sync has been upserted and thus has a stable id.
    let mut touched = 0u32;
    for item in &discovered {
        let existing = store.get_plan(project, item.phase, item.plan_number)?;
        let plan = existing
            .unwrap_or_else(|| Plan::new(project, item.phase, item.plan_number))
            .files_written(item.front.files_modified.iter().cloned().collect())
            .files_read(item.front.files_read.iter().cloned().collect())
            .autonomous(item.front.autonomous);
        store.upsert_plan(&plan)?;
        touched += 1;
    }

    let mut depends_by_key: Vec<(u32, u32, Vec<String>)> = Vec::new();
    for item in &discovered {
        depends_by_key.push((item.phase, item.plan_number, item.front.depends_on.clone()));
    }
    for (phase, plan_number, depends_on) in depends_by_key {
        let Some(plan) = store.get_plan(project, phase, plan_number)? else { continue };
        let mut resolved = std::collections::BTreeSet::new();
        for slug in &depends_on {
            if let Some(dep_plan_number) = plan_number_from_slug(slug) {
                let dep_phase = slug.split('-').next().and_then(|s| s.parse().ok()).unwrap_or(phase);
                if let Some(dep) = store.get_plan(project, dep_phase, dep_plan_number)? {
                    resolved.insert(dep.id);
                }
            }
        }
        let plan = plan.depends_on(resolved);
        store.upsert_plan(&plan)?;
    }

    // Phase verification markers only ever upgrade: a phase whose directory
    // carries VERIFICATION.md and whose plans are all executed moves those
    // plans to `verified`. A missing marker never downgrades anything.
    let phases: std::collections::BTreeSet<u32> = discovered.iter().map(|d| d.phase).collect();
    for phase in phases {
        let phase_dir = project_root.join("specs").join(format!("phase-{phase:02}"));
        if !phase_has_verification_marker(&phase_dir) {
            continue;
        }
        for plan in store.list_plans(project)? {
            if plan.phase == phase && plan.status == PlanStatus::EXECUTED {
                store.set_plan_status(&plan.id, PlanStatus::VERIFIED, false)?;
            }
        }
    }

    Ok(touched)
}
