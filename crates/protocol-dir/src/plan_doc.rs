// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of Plan Documents: `NN-MM-PLAN.md` files whose YAML front matter
//! declares scheduling metadata (§6). The markdown body itself is opaque;
//! only the front matter is interpreted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolDirError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSpecDoc {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationManifestDoc {
    #[serde(default)]
    pub must_pass: Vec<VerificationSpecDoc>,
    #[serde(default)]
    pub should_pass: Vec<VerificationSpecDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFrontMatter {
    pub plan_id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub files_read: Vec<String>,
    #[serde(default)]
    pub checkpoints: Vec<String>,
    #[serde(default)]
    pub autonomous: bool,
    #[serde(default)]
    pub verification: VerificationManifestDoc,
}

/// Quick-read execution-state summary from a root-level `ROADMAP.md`'s front
/// matter. When present, this is authoritative over scanning (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapFrontMatter {
    pub current_phase: u32,
    pub current_plan: u32,
    pub status: String,
}

/// Split a markdown document into its YAML front matter (delimited by `---`
/// lines) and body. Documents without a front-matter block have no metadata.
fn split_front_matter(contents: &str) -> Option<&str> {
    let rest = contents.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

pub fn parse_plan_document(path: &Path, contents: &str) -> Result<PlanFrontMatter, ProtocolDirError> {
    let yaml = split_front_matter(contents)
        .ok_or_else(|| ProtocolDirError::NotFound(format!("front matter in {}", path.display())))?;
    serde_yaml::from_str(yaml)
        .map_err(|source| ProtocolDirError::FrontMatter { path: path.display().to_string(), source })
}

pub fn parse_roadmap(path: &Path, contents: &str) -> Result<Option<RoadmapFrontMatter>, ProtocolDirError> {
    match split_front_matter(contents) {
        Some(yaml) => serde_yaml::from_str(yaml)
            .map(Some)
            .map_err(|source| ProtocolDirError::FrontMatter { path: path.display().to_string(), source }),
        None => Ok(None),
    }
}

/// A phase directory is interpreted as verified by the sync operation when
/// it contains a `VERIFICATION.md` file (§6); content is not inspected.
pub fn phase_has_verification_marker(phase_dir: &Path) -> bool {
    phase_dir.join("VERIFICATION.md").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_minimal_front_matter() {
        let doc = "---\nplan_id: p1\nfiles_modified:\n  - src/a.ts\n---\n\nBody text.\n";
        let parsed = parse_plan_document(&PathBuf::from("01-01-PLAN.md"), doc).unwrap();
        assert_eq!(parsed.plan_id, "p1");
        assert_eq!(parsed.files_modified, vec!["src/a.ts".to_string()]);
        assert!(!parsed.autonomous);
    }

    #[test]
    fn missing_front_matter_is_rejected() {
        let err = parse_plan_document(&PathBuf::from("x.md"), "just text");
        assert!(matches!(err, Err(ProtocolDirError::NotFound(_))));
    }

    #[test]
    fn roadmap_without_front_matter_returns_none() {
        let result = parse_roadmap(&PathBuf::from("ROADMAP.md"), "# plain roadmap\n").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn verification_marker_requires_file_present() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!phase_has_verification_marker(dir.path()));
        std::fs::write(dir.path().join("VERIFICATION.md"), "ok").unwrap();
        assert!(phase_has_verification_marker(dir.path()));
    }
}
