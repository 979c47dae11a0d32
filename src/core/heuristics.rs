//! Cheap deterministic review checks, run before any remote judgment.
//!
//! These never touch the network and always produce the same issues for the
//! same candidate text. The reviewer falls back to them alone when the
//! completion service is unavailable.

use std::sync::LazyLock;

use regex::Regex;

/// Candidates with fewer stripped characters than this cannot plausibly
/// implement a task.
pub const MIN_BODY_CHARS: usize = 20;

/// Marker lines that indicate a candidate was left unfinished.
///
/// Statement markers are line-anchored where substring matching would
/// misfire (`pass` inside `password`).
static INCOMPLETE_MARKERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"\bTODO\b").expect("valid regex"), "TODO"),
        (Regex::new(r"\bFIXME\b").expect("valid regex"), "FIXME"),
        (Regex::new(r"(?m)^\s*pass\s*$").expect("valid regex"), "pass"),
        (
            Regex::new(r"(?m)^\s*\.\.\.\s*$").expect("valid regex"),
            "...",
        ),
    ]
});

/// Comment marker the generator substitutes when the completion call fails.
static GENERATION_FAILURE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*# Error:").expect("valid regex"));

/// Inspect candidate code and return every issue found, in a stable order.
///
/// An empty result means the candidate passes the local checks.
pub fn find_issues(code: &str) -> Vec<String> {
    let mut issues = Vec::new();

    let markers: Vec<&str> = INCOMPLETE_MARKERS
        .iter()
        .filter(|(re, _)| re.is_match(code))
        .map(|(_, name)| *name)
        .collect();
    if !markers.is_empty() {
        issues.push(format!("Code looks incomplete (has {})", markers.join(", ")));
    }

    if code.trim().len() < MIN_BODY_CHARS {
        issues.push("Code seems too short to be complete".to_string());
    }

    if GENERATION_FAILURE_MARKER.is_match(code) {
        issues.push("Code is only a generation error placeholder".to_string());
    }

    issues
}
