//! Shared deterministic types for the pipeline core.
//!
//! These types define the contracts between the generator, reviewer, runner
//! and coordinator. They carry no I/O handles and must remain stable across
//! runs so that serialized attempt artifacts stay comparable.

use serde::{Deserialize, Serialize};

/// Natural-language description of the computation to produce.
///
/// Immutable for the duration of one coordination run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A generated code artifact, tied to the attempt that produced it.
///
/// Candidates are discarded after their round; only failure detail text
/// survives into the next generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub code: String,
    /// 1-based attempt number that produced this candidate.
    pub attempt: u32,
}

/// Reviewer decision on a candidate, consumed immediately by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub feedback: String,
}

impl Verdict {
    pub fn approved() -> Self {
        Self {
            approved: true,
            feedback: String::new(),
        }
    }

    pub fn rejected(feedback: impl Into<String>) -> Self {
        Self {
            approved: false,
            feedback: feedback.into(),
        }
    }
}

/// Classification of a failed execution, ordered by specificity.
///
/// `Syntax` and `UndefinedName` are matched first by the classifier;
/// everything else raised by the candidate lands in `Runtime`. The remaining
/// variants are produced outside the interpreter: `Timeout` when the sandbox
/// is killed at its wall-clock budget, `Rejected` when the reviewer vetoes a
/// candidate before execution, and `Sandbox` when the sandbox itself could
/// not run or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Syntax,
    UndefinedName,
    Runtime,
    Timeout,
    Rejected,
    Sandbox,
}

/// Terminal result of executing (or refusing to execute) one candidate.
///
/// Exactly one of these is the last outcome of every coordination run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Success {
        /// Captured result text, e.g. `Result: 55`.
        output: String,
    },
    Failure {
        kind: FailureKind,
        /// Human-readable detail, fed back verbatim into the next generation.
        detail: String,
        /// Source line, populated for syntax failures when the parser knows it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
    },
}

impl ExecutionOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            detail: detail.into(),
            line: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Detail text for failures, `None` for successes.
    pub fn error_detail(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { detail, .. } => Some(detail.as_str()),
        }
    }
}
