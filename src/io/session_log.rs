//! Per-attempt artifact logging under the artifacts directory.
//!
//! Every coordination run gets a session directory; every attempt inside it
//! gets its own subdirectory holding the candidate, the review verdict, the
//! execution outcome, the sandbox log, and a small meta record. Artifacts
//! are product output, written regardless of tracing configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::core::types::{ExecutionOutcome, Verdict};

/// Summary record written once per attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptMeta {
    pub attempt: u32,
    pub max_tries: u32,
    pub approved: bool,
    /// False when a review rejection skipped execution.
    pub executed: bool,
    pub duration_ms: u64,
}

/// Canonical artifact paths for one attempt.
#[derive(Debug, Clone)]
pub struct AttemptPaths {
    pub dir: PathBuf,
    pub candidate_path: PathBuf,
    pub review_path: PathBuf,
    pub outcome_path: PathBuf,
    pub sandbox_log_path: PathBuf,
    pub meta_path: PathBuf,
}

impl AttemptPaths {
    pub fn new(session_dir: &Path, attempt: u32) -> Self {
        let dir = session_dir.join(format!("attempt-{attempt}"));
        Self {
            dir: dir.clone(),
            candidate_path: dir.join("candidate.py"),
            review_path: dir.join("review.json"),
            outcome_path: dir.join("outcome.json"),
            sandbox_log_path: dir.join("sandbox.log"),
            meta_path: dir.join("meta.json"),
        }
    }
}

/// Allocate a fresh session directory under `<artifacts_dir>/sessions/`.
///
/// Ids are `session-<unix-secs>`, suffixed on collision so two runs started
/// within the same second stay separate.
pub fn allocate_session_dir(artifacts_dir: &Path) -> Result<PathBuf> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    let base = format!("session-{secs}");

    for suffix in 1..=999u32 {
        let id = if suffix == 1 {
            base.clone()
        } else {
            format!("{base}-{suffix}")
        };
        let dir = artifacts_dir.join("sessions").join(&id);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("create session dir {}", dir.display()))?;
            return Ok(dir);
        }
    }

    Err(anyhow!(
        "unable to allocate unique session dir from base '{base}'"
    ))
}

pub fn write_candidate(paths: &AttemptPaths, code: &str) -> Result<()> {
    ensure_dir(paths)?;
    write_text(&paths.candidate_path, code)
}

pub fn write_review(paths: &AttemptPaths, verdict: &Verdict) -> Result<()> {
    ensure_dir(paths)?;
    write_json(&paths.review_path, verdict)
}

pub fn write_outcome(paths: &AttemptPaths, outcome: &ExecutionOutcome) -> Result<()> {
    ensure_dir(paths)?;
    write_json(&paths.outcome_path, outcome)
}

pub fn write_sandbox_log(paths: &AttemptPaths, log: &str) -> Result<()> {
    ensure_dir(paths)?;
    write_text(&paths.sandbox_log_path, log)
}

pub fn write_meta(paths: &AttemptPaths, meta: &AttemptMeta) -> Result<()> {
    ensure_dir(paths)?;
    write_json(&paths.meta_path, meta)
}

fn ensure_dir(paths: &AttemptPaths) -> Result<()> {
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create attempt dir {}", paths.dir.display()))
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_text(path, &buf)
}
