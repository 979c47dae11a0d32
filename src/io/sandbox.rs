//! Isolated execution of candidate code via the embedded driver script.
//!
//! The candidate never runs in this process. It is written next to a fixed
//! driver program inside the attempt directory and executed with
//! `python3 -I` under a wall-clock timeout. The driver reports one JSON
//! object on stdout, which is schema-validated before anything trusts it.
//! The capture limit is handed to the driver so the escaped report line
//! always fits inside the bounded capture.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use jsonschema::Draft;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::classify::SandboxReport;
use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Driver program executed inside the interpreter.
pub const DRIVER_SOURCE: &str = include_str!("sandbox/driver.py");

const REPORT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/sandbox_report/v1.schema.json"
));

/// File names written into the attempt directory before each run.
pub const CANDIDATE_FILE: &str = "candidate.py";
pub const DRIVER_FILE: &str = "driver.py";

/// Everything observed from one sandbox invocation.
#[derive(Debug)]
pub struct SandboxRun {
    pub evidence: SandboxEvidence,
    /// Human-readable run log (exit status plus captured stderr).
    pub log: String,
}

/// What the sandbox produced, before classification.
#[derive(Debug)]
pub enum SandboxEvidence {
    /// Driver emitted a schema-valid report.
    Reported(SandboxReport),
    /// Child was killed at the wall-clock budget.
    TimedOut { budget: Duration },
    /// The sandbox ran but did not produce a usable report.
    Faulted { detail: String },
}

/// Sandbox process launcher, configured once at startup.
#[derive(Debug, Clone)]
pub struct Sandbox {
    python_bin: String,
    timeout: Duration,
    memory_limit_mb: u32,
    output_limit_bytes: usize,
}

impl Sandbox {
    pub fn new(
        python_bin: impl Into<String>,
        timeout: Duration,
        memory_limit_mb: u32,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            python_bin: python_bin.into(),
            timeout,
            memory_limit_mb,
            output_limit_bytes,
        }
    }

    /// Write the candidate and driver into `dir`, execute, and gather evidence.
    ///
    /// Returns `Err` only when the attempt directory cannot be prepared or the
    /// interpreter cannot be spawned; the caller digests that into a failure
    /// outcome. A driver that runs but misreports is `Faulted`, not `Err`.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn run(&self, dir: &Path, code: &str) -> Result<SandboxRun> {
        fs::create_dir_all(dir).with_context(|| format!("create sandbox dir {}", dir.display()))?;
        let candidate_path = dir.join(CANDIDATE_FILE);
        fs::write(&candidate_path, code)
            .with_context(|| format!("write {}", candidate_path.display()))?;
        let driver_path = dir.join(DRIVER_FILE);
        fs::write(&driver_path, DRIVER_SOURCE)
            .with_context(|| format!("write {}", driver_path.display()))?;

        info!(python = %self.python_bin, timeout_secs = self.timeout.as_secs(), "executing candidate");
        let mut cmd = Command::new(&self.python_bin);
        cmd.arg("-I")
            .arg(&driver_path)
            .arg(&candidate_path)
            .arg(self.memory_limit_mb.to_string())
            .arg(self.output_limit_bytes.to_string())
            .current_dir(dir);

        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run sandbox interpreter {}", self.python_bin))?;

        let log = run_log(&output);
        if output.timed_out {
            warn!(budget_secs = self.timeout.as_secs(), "candidate timed out");
            return Ok(SandboxRun {
                evidence: SandboxEvidence::TimedOut {
                    budget: self.timeout,
                },
                log,
            });
        }

        let evidence = match extract_report(&output.stdout_text()) {
            Ok(report) => {
                debug!(ok = report.ok, "driver report validated");
                SandboxEvidence::Reported(report)
            }
            Err(problem) => {
                warn!(problem = %problem, exit_code = ?output.status.code(), "unusable driver report");
                SandboxEvidence::Faulted {
                    detail: fault_detail(problem, &output),
                }
            }
        };
        Ok(SandboxRun { evidence, log })
    }
}

/// Parse and schema-validate the report from the driver's stdout.
///
/// The driver writes exactly one JSON line; the last non-empty line is taken
/// so stray interpreter noise ahead of it cannot break parsing.
fn extract_report(stdout: &str) -> std::result::Result<SandboxReport, String> {
    let line = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "driver produced no report on stdout".to_string())?;

    let value: Value = serde_json::from_str(line)
        .map_err(|err| format!("driver report is not valid JSON: {err}"))?;
    validate_report_schema(&value)?;
    serde_json::from_value(value).map_err(|err| format!("driver report shape mismatch: {err}"))
}

/// Validate a report instance against the embedded schema (Draft 2020-12).
fn validate_report_schema(instance: &Value) -> std::result::Result<(), String> {
    let schema: Value = serde_json::from_str(REPORT_SCHEMA).expect("embedded schema is valid JSON");
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("embedded schema compiles");
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "driver report failed schema validation: {}",
            messages.join("; ")
        ))
    }
}

fn fault_detail(problem: String, output: &CommandOutput) -> String {
    let mut detail = problem;
    if let Some(code) = output.status.code() {
        detail.push_str(&format!(" (interpreter exit code {code})"));
    }
    if output.stdout_truncated > 0 {
        detail.push_str(&format!(
            " (stdout truncated {} bytes)",
            output.stdout_truncated
        ));
    }
    let stderr = output.stderr_text();
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        let tail: String = stderr.chars().take(200).collect();
        detail.push_str(&format!("; stderr: {tail}"));
    }
    detail
}

fn run_log(output: &CommandOutput) -> String {
    let mut buf = String::new();
    buf.push_str(&format!(
        "exit: {:?}\ntimed_out: {}\n=== stderr ===\n",
        output.status.code(),
        output.timed_out
    ));
    buf.push_str(&output.stderr_text());
    buf.push_str(&output.stderr_truncated_notice("sandbox"));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::ReportedKind;

    #[test]
    fn extract_report_accepts_success_line() {
        let report = extract_report(r#"{"ok": true, "output": "Result: 55", "error": null}"#)
            .expect("valid report");
        assert!(report.ok);
        assert_eq!(report.output.as_deref(), Some("Result: 55"));
    }

    #[test]
    fn extract_report_takes_last_nonempty_line() {
        let stdout = "warning: something harmless\n{\"ok\": true, \"output\": \"x\", \"error\": null}\n\n";
        let report = extract_report(stdout).expect("valid report");
        assert!(report.ok);
    }

    #[test]
    fn extract_report_rejects_empty_stdout() {
        let err = extract_report("\n\n").expect_err("no report");
        assert!(err.contains("no report"));
    }

    #[test]
    fn extract_report_rejects_non_json() {
        let err = extract_report("Traceback (most recent call last):").expect_err("not json");
        assert!(err.contains("not valid JSON"));
    }

    #[test]
    fn extract_report_rejects_schema_violations() {
        // ok=false must carry an error object.
        let err = extract_report(r#"{"ok": false, "output": null, "error": null}"#)
            .expect_err("schema violation");
        assert!(err.contains("schema validation"));

        let err = extract_report(r#"{"ok": true, "output": "x", "error": null, "extra": 1}"#)
            .expect_err("schema violation");
        assert!(err.contains("schema validation"));
    }

    #[test]
    fn extract_report_parses_error_payload() {
        let stdout = r#"{"ok": false, "output": null, "error": {"kind": "syntax", "type": "SyntaxError", "message": "invalid syntax", "line": 2}}"#;
        let report = extract_report(stdout).expect("valid report");
        let error = report.error.expect("error payload");
        assert_eq!(error.kind, ReportedKind::Syntax);
        assert_eq!(error.line, Some(2));
    }

    #[test]
    fn embedded_schema_compiles() {
        let value: Value = serde_json::from_str(REPORT_SCHEMA).expect("schema json");
        jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&value)
            .expect("schema compiles");
    }
}
