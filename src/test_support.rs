//! Test-only scripted stand-ins for the pipeline seams.
//!
//! Scripted doubles replay a fixed sequence of responses and record what they
//! were called with, so tests can drive the attempt loop deterministically
//! without a network or an interpreter. Queue exhaustion panics: a test that
//! consumes more responses than it scripted is asserting the wrong flow.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::agents::{Generator, Reviewer, Runner};
use crate::core::types::{Candidate, ExecutionOutcome, Task, Verdict};
use crate::io::completion::{CompletionClient, CompletionError, CompletionRequest};
use crate::io::console::{Mood, Narrator};

/// Completion client that replays scripted reply texts in order.
pub struct ScriptedCompletion {
    replies: RefCell<VecDeque<String>>,
    failure: Option<String>,
    /// Every request passed to `complete`, in call order.
    pub requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn replies(replies: Vec<String>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            failure: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// A client whose every call fails with a network error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: RefCell::new(VecDeque::new()),
            failure: Some(message.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Panic if any scripted reply was left unconsumed.
    pub fn assert_drained(&self) {
        let remaining = self.replies.borrow().len();
        assert_eq!(remaining, 0, "{remaining} scripted replies left unused");
    }
}

impl CompletionClient for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(message) = &self.failure {
            return Err(CompletionError::Network(message.clone()));
        }
        match self.replies.borrow_mut().pop_front() {
            Some(reply) => Ok(reply),
            None => panic!("scripted completion exhausted after {} calls", self.requests.borrow().len()),
        }
    }
}

/// One announcement captured by [`RecordingNarrator`].
#[derive(Debug, Clone)]
pub struct Announcement {
    pub speaker: String,
    pub text: String,
    pub mood: Mood,
}

/// Narrator that records announcements instead of printing them.
#[derive(Debug, Default)]
pub struct RecordingNarrator {
    pub announcements: RefCell<Vec<Announcement>>,
}

impl RecordingNarrator {
    /// Texts announced by `speaker`, in order.
    pub fn texts_for(&self, speaker: &str) -> Vec<String> {
        self.announcements
            .borrow()
            .iter()
            .filter(|a| a.speaker == speaker)
            .map(|a| a.text.clone())
            .collect()
    }
}

impl Narrator for RecordingNarrator {
    fn announce(&self, speaker: &str, text: &str, mood: Mood) {
        self.announcements.borrow_mut().push(Announcement {
            speaker: speaker.to_string(),
            text: text.to_string(),
            mood,
        });
    }
}

/// Generator that replays scripted candidate bodies.
///
/// Records the prior error (if any) passed to each call so tests can verify
/// feedback threading between attempts.
pub struct ScriptedGenerator {
    bodies: RefCell<VecDeque<String>>,
    pub prior_errors: RefCell<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    pub fn new(bodies: Vec<String>) -> Self {
        Self {
            bodies: RefCell::new(bodies.into()),
            prior_errors: RefCell::new(Vec::new()),
        }
    }

    pub fn assert_drained(&self) {
        let remaining = self.bodies.borrow().len();
        assert_eq!(remaining, 0, "{remaining} scripted candidates left unused");
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, _task: &Task, attempt: u32, prior_error: Option<&str>) -> Candidate {
        self.prior_errors
            .borrow_mut()
            .push(prior_error.map(str::to_string));
        let code = self
            .bodies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted candidate for attempt {attempt}"));
        Candidate { code, attempt }
    }
}

/// Reviewer that replays scripted verdicts.
pub struct ScriptedReviewer {
    verdicts: RefCell<VecDeque<Verdict>>,
}

impl ScriptedReviewer {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self {
            verdicts: RefCell::new(verdicts.into()),
        }
    }

    pub fn assert_drained(&self) {
        let remaining = self.verdicts.borrow().len();
        assert_eq!(remaining, 0, "{remaining} scripted verdicts left unused");
    }
}

impl Reviewer for ScriptedReviewer {
    fn review(&self, candidate: &Candidate, _task: &Task) -> Verdict {
        self.verdicts
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted verdict for attempt {}", candidate.attempt))
    }
}

/// Reviewer that approves every candidate, for flows where review is not
/// under test.
#[derive(Debug, Default)]
pub struct ApproveAll;

impl Reviewer for ApproveAll {
    fn review(&self, _candidate: &Candidate, _task: &Task) -> Verdict {
        Verdict::approved()
    }
}

/// Runner that replays scripted outcomes.
///
/// Records the attempt number of every execution so tests can verify that
/// review rejections skip the runner.
pub struct ScriptedRunner {
    outcomes: RefCell<VecDeque<ExecutionOutcome>>,
    pub executed: RefCell<Vec<u32>>,
}

impl ScriptedRunner {
    pub fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            executed: RefCell::new(Vec::new()),
        }
    }

    pub fn assert_drained(&self) {
        let remaining = self.outcomes.borrow().len();
        assert_eq!(remaining, 0, "{remaining} scripted outcomes left unused");
    }
}

impl Runner for ScriptedRunner {
    fn execute(&self, candidate: &Candidate) -> ExecutionOutcome {
        self.executed.borrow_mut().push(candidate.attempt);
        self.outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted outcome for attempt {}", candidate.attempt))
    }
}
