//! Bounded-retry coordination of generator, reviewer and runner.
//!
//! One `run_task` call drives at most `max_tries` attempts. Error detail from
//! a failed attempt is threaded verbatim into the next generation request;
//! nothing else survives between attempts.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, anyhow};
use tracing::{info, instrument};

use crate::agents::{Generator, Reviewer, Runner};
use crate::core::types::{ExecutionOutcome, FailureKind, Task};
use crate::io::console::{Mood, Narrator};
use crate::io::session_log::{self, AttemptMeta, AttemptPaths};

pub const SPEAKER: &str = "Orchestrator";

/// Reason why `run_task` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStop {
    /// A candidate executed successfully.
    Succeeded,
    /// Every attempt failed; the final outcome carries the last failure.
    ExhaustedRetries,
}

/// Summary of one coordination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub attempts_used: u32,
    pub stop: PipelineStop,
    /// Outcome of the last attempt that reached a terminal state.
    pub outcome: ExecutionOutcome,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_tries: u32,
    /// Session directory receiving `attempt-N/` artifact subdirectories.
    pub session_dir: PathBuf,
}

/// Drive generate, review, execute until success or `max_tries` attempts.
///
/// A review rejection before the final attempt skips execution and becomes a
/// `Rejected` failure; its feedback is the next attempt's prior error. A
/// rejection on the final attempt still executes, as a last chance. Returns
/// `Err` only for invalid configuration or unwritable artifacts; candidate
/// failures are data, not errors.
#[instrument(skip_all, fields(max_tries = config.max_tries))]
pub fn run_task<G: Generator, R: Reviewer, X: Runner>(
    task: &Task,
    generator: &G,
    reviewer: &R,
    runner: &X,
    narrator: &dyn Narrator,
    config: &PipelineConfig,
) -> Result<PipelineOutcome> {
    narrator.announce(
        SPEAKER,
        &format!(
            "Got a new task: '{}'\nLet me coordinate the team...",
            task.description
        ),
        Mood::Info,
    );

    let mut prior_error: Option<String> = None;
    for attempt in 1..=config.max_tries {
        narrator.announce(
            SPEAKER,
            &format!("Round {attempt} of {}", config.max_tries),
            Mood::Info,
        );
        let started = Instant::now();

        let candidate = generator.generate(task, attempt, prior_error.as_deref());
        let paths = AttemptPaths::new(&config.session_dir, attempt);
        session_log::write_candidate(&paths, &candidate.code)?;

        let verdict = reviewer.review(&candidate, task);
        session_log::write_review(&paths, &verdict)?;

        if !verdict.approved && attempt < config.max_tries {
            narrator.announce(
                SPEAKER,
                "Reviewer found issues. Sending back to Coder...",
                Mood::Info,
            );
            let outcome =
                ExecutionOutcome::failure(FailureKind::Rejected, verdict.feedback.as_str());
            session_log::write_outcome(&paths, &outcome)?;
            session_log::write_meta(
                &paths,
                &AttemptMeta {
                    attempt,
                    max_tries: config.max_tries,
                    approved: false,
                    executed: false,
                    duration_ms: started.elapsed().as_millis() as u64,
                },
            )?;
            prior_error = Some(verdict.feedback);
            continue;
        }
        if !verdict.approved {
            narrator.announce(
                SPEAKER,
                "Reviewer found issues, but this is the last round. Running it anyway...",
                Mood::Info,
            );
        }

        let outcome = runner.execute(&candidate);
        session_log::write_outcome(&paths, &outcome)?;
        session_log::write_meta(
            &paths,
            &AttemptMeta {
                attempt,
                max_tries: config.max_tries,
                approved: verdict.approved,
                executed: true,
                duration_ms: started.elapsed().as_millis() as u64,
            },
        )?;

        if outcome.is_success() {
            narrator.announce(
                SPEAKER,
                &format!("Task completed successfully in {attempt} attempts! \u{1f389}"),
                Mood::Success,
            );
            info!(attempt, "task succeeded");
            return Ok(PipelineOutcome {
                attempts_used: attempt,
                stop: PipelineStop::Succeeded,
                outcome,
            });
        }
        if attempt == config.max_tries {
            narrator.announce(
                SPEAKER,
                &format!(
                    "Tried {} times but couldn't solve it. Might need human help.",
                    config.max_tries
                ),
                Mood::Error,
            );
            info!(attempts = attempt, "retries exhausted");
            return Ok(PipelineOutcome {
                attempts_used: attempt,
                stop: PipelineStop::ExhaustedRetries,
                outcome,
            });
        }
        narrator.announce(
            SPEAKER,
            "That didn't work. Let's try again with the feedback...",
            Mood::Info,
        );
        prior_error = outcome.error_detail().map(str::to_string);
    }

    Err(anyhow!("max_tries must be >= 1"))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::types::Verdict;
    use crate::test_support::{
        ApproveAll, RecordingNarrator, ScriptedGenerator, ScriptedReviewer, ScriptedRunner,
    };

    fn task() -> Task {
        Task::new("Write a Python function that calculates the 10th Fibonacci number")
    }

    fn config(max_tries: u32, session_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            max_tries,
            session_dir: session_dir.to_path_buf(),
        }
    }

    #[test]
    fn zero_max_tries_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(Vec::new());
        let reviewer = ScriptedReviewer::new(Vec::new());
        let runner = ScriptedRunner::new(Vec::new());
        let narrator = RecordingNarrator::default();

        let err = run_task(
            &task(),
            &generator,
            &reviewer,
            &runner,
            &narrator,
            &config(0, temp.path()),
        )
        .expect_err("invalid bound");

        assert!(err.to_string().contains("max_tries"));
    }

    #[test]
    fn success_on_first_attempt_stops_the_loop() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(vec!["result = 55\n".to_string()]);
        let reviewer = ScriptedReviewer::new(vec![Verdict::approved()]);
        let runner = ScriptedRunner::new(vec![ExecutionOutcome::success("Result: 55")]);
        let narrator = RecordingNarrator::default();

        let outcome = run_task(
            &task(),
            &generator,
            &reviewer,
            &runner,
            &narrator,
            &config(3, temp.path()),
        )
        .expect("run");

        assert_eq!(outcome.stop, PipelineStop::Succeeded);
        assert_eq!(outcome.attempts_used, 1);
        assert_eq!(outcome.outcome, ExecutionOutcome::success("Result: 55"));
        assert_eq!(*runner.executed.borrow(), vec![1]);
        generator.assert_drained();
        reviewer.assert_drained();
        runner.assert_drained();
    }

    #[test]
    fn rejection_skips_execution_and_threads_feedback() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(vec![
            "def fibonacci(n):\n    return n\n".to_string(),
            "result = 55\n".to_string(),
        ]);
        let feedback = "The function is defined but never called";
        let reviewer =
            ScriptedReviewer::new(vec![Verdict::rejected(feedback), Verdict::approved()]);
        let runner = ScriptedRunner::new(vec![ExecutionOutcome::success("Result: 55")]);
        let narrator = RecordingNarrator::default();

        let outcome = run_task(
            &task(),
            &generator,
            &reviewer,
            &runner,
            &narrator,
            &config(3, temp.path()),
        )
        .expect("run");

        assert_eq!(outcome.stop, PipelineStop::Succeeded);
        assert_eq!(outcome.attempts_used, 2);
        // The rejected attempt never reached the runner.
        assert_eq!(*runner.executed.borrow(), vec![2]);
        assert_eq!(
            *generator.prior_errors.borrow(),
            vec![None, Some(feedback.to_string())]
        );
    }

    #[test]
    fn failure_detail_threads_into_next_generation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(vec![
            "result = 1 / 0\n".to_string(),
            "result = 55\n".to_string(),
        ]);
        let runner = ScriptedRunner::new(vec![
            ExecutionOutcome::failure(FailureKind::Runtime, "ZeroDivisionError: division by zero"),
            ExecutionOutcome::success("Result: 55"),
        ]);
        let narrator = RecordingNarrator::default();

        let outcome = run_task(
            &task(),
            &generator,
            &ApproveAll,
            &runner,
            &narrator,
            &config(2, temp.path()),
        )
        .expect("run");

        assert_eq!(outcome.stop, PipelineStop::Succeeded);
        assert_eq!(outcome.attempts_used, 2);
        assert_eq!(
            *generator.prior_errors.borrow(),
            vec![
                None,
                Some("ZeroDivisionError: division by zero".to_string())
            ]
        );
    }

    #[test]
    fn exhausts_retries_and_reports_last_outcome() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(vec![
            "fib(10)\n".to_string(),
            "fib(10)\n".to_string(),
            "fib(10)\n".to_string(),
        ]);
        let last = ExecutionOutcome::failure(
            FailureKind::UndefinedName,
            "Variable or function not found: name 'fib' is not defined",
        );
        let runner = ScriptedRunner::new(vec![
            ExecutionOutcome::failure(FailureKind::Runtime, "TypeError: bad operand"),
            ExecutionOutcome::failure(FailureKind::Runtime, "TypeError: bad operand"),
            last.clone(),
        ]);
        let narrator = RecordingNarrator::default();

        let outcome = run_task(
            &task(),
            &generator,
            &ApproveAll,
            &runner,
            &narrator,
            &config(3, temp.path()),
        )
        .expect("run");

        assert_eq!(outcome.stop, PipelineStop::ExhaustedRetries);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(outcome.outcome, last);
        assert_eq!(*runner.executed.borrow(), vec![1, 2, 3]);
        runner.assert_drained();
    }

    #[test]
    fn rejected_final_attempt_still_executes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let generator = ScriptedGenerator::new(vec!["result = 55\n".to_string()]);
        let reviewer = ScriptedReviewer::new(vec![Verdict::rejected("needs a docstring")]);
        let runner = ScriptedRunner::new(vec![ExecutionOutcome::success("Result: 55")]);
        let narrator = RecordingNarrator::default();

        let outcome = run_task(
            &task(),
            &generator,
            &reviewer,
            &runner,
            &narrator,
            &config(1, temp.path()),
        )
        .expect("run");

        assert_eq!(outcome.stop, PipelineStop::Succeeded);
        assert_eq!(*runner.executed.borrow(), vec![1]);
    }

    #[test]
    fn writes_artifacts_for_every_attempt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = temp.path().join("session-1");
        let generator = ScriptedGenerator::new(vec![
            "# TODO\npass\n".to_string(),
            "result = 55\n".to_string(),
        ]);
        let reviewer = ScriptedReviewer::new(vec![
            Verdict::rejected("Code looks incomplete (has TODO)"),
            Verdict::approved(),
        ]);
        let runner = ScriptedRunner::new(vec![ExecutionOutcome::success("Result: 55")]);
        let narrator = RecordingNarrator::default();

        run_task(
            &task(),
            &generator,
            &reviewer,
            &runner,
            &narrator,
            &config(3, &session),
        )
        .expect("run");

        let first = AttemptPaths::new(&session, 1);
        let second = AttemptPaths::new(&session, 2);
        assert!(first.candidate_path.is_file());
        assert!(first.review_path.is_file());
        assert!(first.outcome_path.is_file());
        assert!(first.meta_path.is_file());
        assert!(second.candidate_path.is_file());
        assert!(second.outcome_path.is_file());

        let outcome_json =
            std::fs::read_to_string(&first.outcome_path).expect("read first outcome");
        assert!(outcome_json.contains("rejected"));
        let meta_json = std::fs::read_to_string(&first.meta_path).expect("read first meta");
        assert!(meta_json.contains("\"executed\": false"));
    }
}
