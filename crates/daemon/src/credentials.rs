// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential lookup for `credentials_needed` worker messages. Readers are
//! plain `KEY=VALUE` files named `<service>.env` or, for a more specific
//! match, `<service>-<context>.env`, under `HARNESS_CREDENTIALS_DIR`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::DaemonError;

fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            out.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
        }
    }
    out
}

/// Looks up credentials for `service`, preferring the context-specific file
/// (`<service>-<context>.env`) when `context` is given and present, falling
/// back to `<service>.env`.
pub fn lookup(credentials_dir: &Path, service: &str, context: Option<&str>) -> Result<HashMap<String, String>, DaemonError> {
    if let Some(context) = context {
        let specific = credentials_dir.join(format!("{service}-{context}.env"));
        if specific.is_file() {
            return read_file(&specific);
        }
    }
    let general = credentials_dir.join(format!("{service}.env"));
    if general.is_file() {
        return read_file(&general);
    }
    Err(DaemonError::NotFound(format!("credentials for service {service}")))
}

fn read_file(path: &PathBuf) -> Result<HashMap<String, String>, DaemonError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| DaemonError::Io { path: path.display().to_string(), source })?;
    Ok(parse_env_file(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_general_file_when_no_context_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("github.env"), "TOKEN=abc123\n").unwrap();
        let creds = lookup(dir.path(), "github", Some("staging")).unwrap();
        assert_eq!(creds.get("TOKEN"), Some(&"abc123".to_string()));
    }

    #[test]
    fn context_specific_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("github.env"), "TOKEN=general\n").unwrap();
        std::fs::write(dir.path().join("github-staging.env"), "TOKEN=staging-only\n").unwrap();
        let creds = lookup(dir.path(), "github", Some("staging")).unwrap();
        assert_eq!(creds.get("TOKEN"), Some(&"staging-only".to_string()));
    }

    #[test]
    fn missing_service_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = lookup(dir.path(), "github", None);
        assert!(matches!(err, Err(DaemonError::NotFound(_))));
    }
}
