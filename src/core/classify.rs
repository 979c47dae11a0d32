//! Classification of sandbox reports into execution outcomes.
//!
//! The sandbox driver emits one JSON report per run. Mapping that report to
//! an [`ExecutionOutcome`] is pure: the same report always classifies the
//! same way. Process-level evidence (timeouts, spawn failures) never reaches
//! this module; the runner maps those directly to `Timeout`/`Sandbox`.

use serde::{Deserialize, Serialize};

use crate::core::types::{ExecutionOutcome, FailureKind};

/// Error category declared by the sandbox driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedKind {
    /// Candidate failed to compile.
    Syntax,
    /// Execution referenced an undefined symbol.
    Name,
    /// Any other raised condition, including a violated result contract.
    Runtime,
}

/// Error payload of a failed run, as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub kind: ReportedKind,
    /// Interpreter exception type name, e.g. `ZeroDivisionError`.
    #[serde(rename = "type")]
    pub type_name: String,
    pub message: String,
    /// Source line, set for syntax errors.
    #[serde(default)]
    pub line: Option<u32>,
}

/// One JSON report line emitted by the sandbox driver on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxReport {
    pub ok: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<ReportedError>,
}

/// Map a validated driver report to an execution outcome.
///
/// Detail strings keep the exact phrasing surfaced to the generator on
/// retries, so changing them changes what the completion service is asked
/// to fix.
pub fn classify_report(report: &SandboxReport) -> ExecutionOutcome {
    if report.ok {
        return ExecutionOutcome::Success {
            output: report.output.clone().unwrap_or_default(),
        };
    }

    let Some(error) = &report.error else {
        // Schema validation makes this unreachable for real driver output.
        return ExecutionOutcome::failure(
            FailureKind::Sandbox,
            "sandbox reported failure without an error payload",
        );
    };

    match error.kind {
        ReportedKind::Syntax => {
            let line = error.line.unwrap_or(1);
            ExecutionOutcome::Failure {
                kind: FailureKind::Syntax,
                detail: format!("Syntax error on line {}: {}", line, error.message),
                line: Some(line),
            }
        }
        ReportedKind::Name => ExecutionOutcome::Failure {
            kind: FailureKind::UndefinedName,
            detail: format!("Variable or function not found: {}", error.message),
            line: error.line,
        },
        ReportedKind::Runtime => ExecutionOutcome::Failure {
            kind: FailureKind::Runtime,
            detail: format!("{}: {}", error.type_name, error.message),
            line: error.line,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_report(kind: ReportedKind, type_name: &str, message: &str) -> SandboxReport {
        SandboxReport {
            ok: false,
            output: None,
            error: Some(ReportedError {
                kind,
                type_name: type_name.to_string(),
                message: message.to_string(),
                line: None,
            }),
        }
    }

    #[test]
    fn successful_report_carries_output() {
        let report = SandboxReport {
            ok: true,
            output: Some("Result: 55".to_string()),
            error: None,
        };
        assert_eq!(
            classify_report(&report),
            ExecutionOutcome::success("Result: 55")
        );
    }

    #[test]
    fn syntax_error_detail_includes_line() {
        let mut report = failed_report(ReportedKind::Syntax, "SyntaxError", "invalid syntax");
        report.error.as_mut().expect("error").line = Some(3);

        let outcome = classify_report(&report);
        assert_eq!(
            outcome,
            ExecutionOutcome::Failure {
                kind: FailureKind::Syntax,
                detail: "Syntax error on line 3: invalid syntax".to_string(),
                line: Some(3),
            }
        );
    }

    #[test]
    fn name_error_maps_to_undefined_name() {
        let report = failed_report(
            ReportedKind::Name,
            "NameError",
            "name 'fibonacci' is not defined",
        );
        let outcome = classify_report(&report);
        assert_eq!(
            outcome,
            ExecutionOutcome::Failure {
                kind: FailureKind::UndefinedName,
                detail: "Variable or function not found: name 'fibonacci' is not defined"
                    .to_string(),
                line: None,
            }
        );
    }

    #[test]
    fn runtime_error_detail_is_type_and_message() {
        let report = failed_report(ReportedKind::Runtime, "ZeroDivisionError", "division by zero");
        let outcome = classify_report(&report);
        assert_eq!(
            outcome.error_detail(),
            Some("ZeroDivisionError: division by zero")
        );
    }

    #[test]
    fn failure_without_error_payload_is_a_sandbox_fault() {
        let report = SandboxReport {
            ok: false,
            output: None,
            error: None,
        };
        let ExecutionOutcome::Failure { kind, .. } = classify_report(&report) else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::Sandbox);
    }

    #[test]
    fn report_round_trips_through_json() {
        let json = r#"{"ok": false, "output": null, "error": {"kind": "name", "type": "NameError", "message": "name 'x' is not defined", "line": null}}"#;
        let report: SandboxReport = serde_json::from_str(json).expect("parse");
        assert!(!report.ok);
        assert_eq!(
            report.error.as_ref().expect("error").kind,
            ReportedKind::Name
        );
    }
}
