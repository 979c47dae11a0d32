//! The three pipeline roles behind trait seams.
//!
//! The coordinator only sees these traits. Concrete implementations talk to
//! the completion service and the sandbox; tests use scripted stand-ins that
//! return predetermined values.

pub mod generator;
pub mod reviewer;
pub mod runner;

use crate::core::types::{Candidate, ExecutionOutcome, Task, Verdict};

/// Writes candidate code for a task.
pub trait Generator {
    /// Produce the candidate for 1-based `attempt`. `prior_error` carries the
    /// previous outcome's detail verbatim so the service can target a fix.
    fn generate(&self, task: &Task, attempt: u32, prior_error: Option<&str>) -> Candidate;
}

/// Judges a candidate before it is allowed to run.
pub trait Reviewer {
    fn review(&self, candidate: &Candidate, task: &Task) -> Verdict;
}

/// Executes a candidate and classifies what happened.
///
/// Implementations must digest every internal fault into a failure outcome;
/// nothing propagates past this boundary.
pub trait Runner {
    fn execute(&self, candidate: &Candidate) -> ExecutionOutcome;
}
