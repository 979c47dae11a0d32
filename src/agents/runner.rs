//! Sandbox-backed execution of candidates.

use std::path::PathBuf;

use tracing::{instrument, warn};

use crate::agents::Runner;
use crate::core::classify::classify_report;
use crate::core::types::{Candidate, ExecutionOutcome, FailureKind};
use crate::io::console::{Mood, Narrator};
use crate::io::sandbox::{Sandbox, SandboxEvidence};
use crate::io::session_log::{self, AttemptPaths};

pub const SPEAKER: &str = "Executor";

/// Runner that executes each candidate in its attempt directory.
///
/// Implements the digest-everything contract: sandbox preparation and spawn
/// failures become `Sandbox` outcomes instead of propagating, so the
/// coordination loop always receives a classified result.
pub struct SandboxRunner<'a> {
    sandbox: Sandbox,
    narrator: &'a dyn Narrator,
    session_dir: PathBuf,
}

impl<'a> SandboxRunner<'a> {
    pub fn new(
        sandbox: Sandbox,
        narrator: &'a dyn Narrator,
        session_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sandbox,
            narrator,
            session_dir: session_dir.into(),
        }
    }

    fn narrate_outcome(&self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Success { output } => self.narrator.announce(
                SPEAKER,
                &format!("Success! Output:\n{output}"),
                Mood::Success,
            ),
            ExecutionOutcome::Failure { kind, detail, .. } => self.narrator.announce(
                SPEAKER,
                &format!("{}\n{detail}", failure_lead(*kind)),
                Mood::Error,
            ),
        }
    }
}

/// Narration lead line for a failure of the given kind.
fn failure_lead(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Syntax => "Code has syntax problems:",
        FailureKind::UndefinedName => "Code references something that doesn't exist:",
        FailureKind::Timeout => "Code ran too long, had to stop it:",
        FailureKind::Sandbox => "Couldn't run the code:",
        FailureKind::Runtime | FailureKind::Rejected => "Something went wrong:",
    }
}

impl Runner for SandboxRunner<'_> {
    #[instrument(skip_all, fields(attempt = candidate.attempt))]
    fn execute(&self, candidate: &Candidate) -> ExecutionOutcome {
        self.narrator
            .announce(SPEAKER, "Running the code now...", Mood::Working);

        let paths = AttemptPaths::new(&self.session_dir, candidate.attempt);
        let outcome = match self.sandbox.run(&paths.dir, &candidate.code) {
            Ok(run) => {
                if let Err(err) = session_log::write_sandbox_log(&paths, &run.log) {
                    warn!(err = %err, "could not write sandbox log");
                }
                match run.evidence {
                    SandboxEvidence::Reported(report) => classify_report(&report),
                    SandboxEvidence::TimedOut { budget } => ExecutionOutcome::failure(
                        FailureKind::Timeout,
                        format!("Execution timed out after {} seconds", budget.as_secs()),
                    ),
                    SandboxEvidence::Faulted { detail } => {
                        ExecutionOutcome::failure(FailureKind::Sandbox, detail)
                    }
                }
            }
            Err(err) => ExecutionOutcome::failure(FailureKind::Sandbox, format!("{err:#}")),
        };

        self.narrate_outcome(&outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::RecordingNarrator;

    #[test]
    fn missing_interpreter_digests_to_sandbox_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(
            "/nonexistent/python-interpreter",
            Duration::from_secs(1),
            64,
            10_000,
        );
        let narrator = RecordingNarrator::default();
        let runner = SandboxRunner::new(sandbox, &narrator, temp.path());

        let outcome = runner.execute(&Candidate {
            code: "result = 55\n".to_string(),
            attempt: 1,
        });

        let ExecutionOutcome::Failure { kind, detail, .. } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::Sandbox);
        assert!(!detail.is_empty());

        let texts = narrator.texts_for(SPEAKER);
        assert_eq!(texts[0], "Running the code now...");
        assert!(texts[1].starts_with("Couldn't run the code:"));
    }

    #[test]
    fn failure_leads_cover_every_kind() {
        assert!(failure_lead(FailureKind::Syntax).contains("syntax"));
        assert!(failure_lead(FailureKind::UndefinedName).contains("doesn't exist"));
        assert!(failure_lead(FailureKind::Timeout).contains("too long"));
        assert_eq!(
            failure_lead(FailureKind::Runtime),
            failure_lead(FailureKind::Rejected)
        );
    }
}
