// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heuristic wait-state classifier (§4.3).
//!
//! Purely heuristic, best-effort: an optimization so the orchestrator need
//! not poll output blindly. The authoritative "worker needs something"
//! signal is a response-required message on the Message Channel; this
//! detector exists to cover workers that pause without using the protocol.
//!
//! These markers reflect one specific host agent's terminal output. An
//! implementer targeting a different agent must re-derive them.

use gsdh_core::event::WaitKind;

const SPINNER_GLYPHS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const WORK_COMPLETE_MARKERS: &[&str] = &["✓", "✔", "Done", "Complete", "complete."];
const PROMPT_GLYPHS: &[&str] = &[">", "❯", "$"];
const PERMISSION_MARKERS: &[&str] = &["allow?", "(y/n)", "yes/no", "[y/n]"];
const CONTINUE_MARKERS: &[&str] = &["press enter", "press any key"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedWait {
    NotWaiting,
    Waiting { kind: WaitKind, option_count: Option<u32>, trigger_snippet: String, intent: Option<WaitKind> },
}

fn has_active_spinner(line: &str) -> bool {
    line.chars().any(|c| SPINNER_GLYPHS.contains(&c))
}

fn has_work_complete_marker(text: &str) -> bool {
    WORK_COMPLETE_MARKERS.iter().any(|marker| text.contains(marker))
}

fn trailing_prompt_glyph(line: &str) -> bool {
    let trimmed = line.trim_end();
    PROMPT_GLYPHS.iter().any(|glyph| trimmed.ends_with(glyph))
}

/// A numbered listing looks like "1) ...", "2. ...", or "[1] ..." on
/// consecutive lines.
fn is_numbered_option_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    trimmed[digits.len()..].starts_with(')') || trimmed[digits.len()..].starts_with('.')
}

/// Classify the tail of a session's output. `lines` should be the last few
/// lines of the live ring buffer, oldest first.
pub fn detect(lines: &[String]) -> DetectedWait {
    if lines.is_empty() {
        return DetectedWait::NotWaiting;
    }

    let joined = lines.join("\n");
    let last_line = lines.last().map(String::as_str).unwrap_or_default();

    if lines.iter().any(|l| has_active_spinner(l)) && !has_work_complete_marker(&joined) {
        return DetectedWait::NotWaiting;
    }

    let option_count = lines.iter().filter(|l| is_numbered_option_line(l)).count() as u32;
    let has_prompt = trailing_prompt_glyph(last_line);

    if !has_prompt {
        return DetectedWait::NotWaiting;
    }

    let lower = joined.to_lowercase();
    let base_kind = if option_count > 0 {
        WaitKind::Menu
    } else if PERMISSION_MARKERS.iter().any(|m| lower.contains(m)) {
        WaitKind::Permission
    } else if CONTINUE_MARKERS.iter().any(|m| lower.contains(m)) {
        WaitKind::Continue
    } else {
        WaitKind::Prompt
    };

    let trigger_snippet = last_line.trim().to_string();

    if has_work_complete_marker(&joined) {
        // A recognized completion marker plus a prompt: surface as waiting
        // with the intent we'd otherwise have classified, so callers can
        // distinguish "finished and now idle" from "blocked mid-task".
        return DetectedWait::Waiting {
            kind: base_kind,
            option_count: if option_count > 0 { Some(option_count) } else { None },
            trigger_snippet,
            intent: Some(base_kind),
        };
    }

    DetectedWait::Waiting {
        kind: base_kind,
        option_count: if option_count > 0 { Some(option_count) } else { None },
        trigger_snippet,
        intent: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &[&str]) -> Vec<String> {
        s.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn spinner_without_completion_is_not_waiting() {
        let result = detect(&lines(&["⠋ building...", ">"]));
        assert_eq!(result, DetectedWait::NotWaiting);
    }

    #[test]
    fn bare_prompt_glyph_is_prompt() {
        let result = detect(&lines(&["ready", ">"]));
        match result {
            DetectedWait::Waiting { kind, .. } => assert_eq!(kind, WaitKind::Prompt),
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn numbered_listing_with_prompt_is_menu() {
        let result = detect(&lines(&["Pick one:", "1) apply patch", "2) skip", ">"]));
        match result {
            DetectedWait::Waiting { kind, option_count, .. } => {
                assert_eq!(kind, WaitKind::Menu);
                assert_eq!(option_count, Some(2));
            }
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn permission_phrasing_is_permission() {
        let result = detect(&lines(&["Allow? (y/n)", ">"]));
        match result {
            DetectedWait::Waiting { kind, .. } => assert_eq!(kind, WaitKind::Permission),
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn press_enter_phrasing_is_continue() {
        let result = detect(&lines(&["press Enter to continue", ">"]));
        match result {
            DetectedWait::Waiting { kind, .. } => assert_eq!(kind, WaitKind::Continue),
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn work_complete_marker_plus_prompt_carries_intent() {
        let result = detect(&lines(&["✓ build complete.", ">"]));
        match result {
            DetectedWait::Waiting { intent, .. } => assert_eq!(intent, Some(WaitKind::Prompt)),
            other => panic!("expected Waiting, got {other:?}"),
        }
    }

    #[test]
    fn empty_buffer_is_not_waiting() {
        assert_eq!(detect(&[]), DetectedWait::NotWaiting);
    }
}
