// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active Files: the write/read holder map enforcing file-conflict admission
//! control (§3, §4.6 rule 4).

use serde::{Deserialize, Serialize};

use crate::clock::MillisSinceEpoch;
use crate::plan::PlanId;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    Read,
    Write,
}

crate::simple_display!(FileMode {
    Read => "read",
    Write => "write",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFileEntry {
    pub path: String,
    pub session: SessionId,
    pub plan: PlanId,
    pub mode: FileMode,
    pub started_at: MillisSinceEpoch,
}

impl ActiveFileEntry {
    pub fn new(
        path: impl Into<String>,
        session: SessionId,
        plan: PlanId,
        mode: FileMode,
        now_millis: MillisSinceEpoch,
    ) -> Self {
        Self { path: path.into(), session, plan, mode, started_at: now_millis }
    }
}

/// Validate the invariant: at most one `write` holder per path, and `read`
/// holders coexist only when there is no `write` holder for that path.
pub fn validate_entries(entries: &[ActiveFileEntry]) -> Result<(), String> {
    use std::collections::HashMap;

    let mut by_path: HashMap<&str, Vec<&ActiveFileEntry>> = HashMap::new();
    for entry in entries {
        by_path.entry(entry.path.as_str()).or_default().push(entry);
    }
    for (path, holders) in by_path {
        let writers = holders.iter().filter(|e| e.mode == FileMode::Write).count();
        let readers = holders.iter().filter(|e| e.mode == FileMode::Read).count();
        if writers > 1 {
            return Err(format!("path {path:?} has {writers} concurrent write holders"));
        }
        if writers == 1 && readers > 0 {
            return Err(format!("path {path:?} has a write holder and {readers} read holders"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, mode: FileMode) -> ActiveFileEntry {
        ActiveFileEntry::new(path, SessionId::new(), PlanId::new(), mode, 0)
    }

    #[test]
    fn single_writer_is_valid() {
        let entries = vec![entry("a.ts", FileMode::Write)];
        assert!(validate_entries(&entries).is_ok());
    }

    #[test]
    fn concurrent_readers_without_writer_are_valid() {
        let entries = vec![entry("a.ts", FileMode::Read), entry("a.ts", FileMode::Read)];
        assert!(validate_entries(&entries).is_ok());
    }

    #[test]
    fn writer_with_reader_is_invalid() {
        let entries = vec![entry("a.ts", FileMode::Write), entry("a.ts", FileMode::Read)];
        assert!(validate_entries(&entries).is_err());
    }

    #[test]
    fn two_writers_are_invalid() {
        let entries = vec![entry("a.ts", FileMode::Write), entry("a.ts", FileMode::Write)];
        assert!(validate_entries(&entries).is_err());
    }
}
