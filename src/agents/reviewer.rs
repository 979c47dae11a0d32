//! Completion-backed code review with a deterministic fallback.

use minijinja::{Environment, context};
use tracing::{debug, instrument, warn};

use crate::agents::Reviewer;
use crate::core::heuristics::find_issues;
use crate::core::types::{Candidate, Task, Verdict};
use crate::io::completion::{ChatMessage, CompletionClient, CompletionRequest};
use crate::io::config::StageParams;
use crate::io::console::{Mood, Narrator};

pub const SPEAKER: &str = "Reviewer";

const REVIEWER_TEMPLATE: &str = include_str!("prompts/reviewer.md");

/// Token the review prompt asks for on acceptance. Matched case-insensitively
/// anywhere in the reply, so "Approved." and "APPROVED - looks correct" both
/// count.
const APPROVAL_TOKEN: &str = "APPROVED";

/// Reviewer that asks the completion service to judge a candidate.
///
/// When the service cannot answer, the verdict comes from [`find_issues`]
/// alone: a marked-up or stub candidate is still rejected, anything else
/// passes. Review never aborts a run.
pub struct CompletionReviewer<'a, C: CompletionClient> {
    client: &'a C,
    narrator: &'a dyn Narrator,
    params: StageParams,
}

impl<'a, C: CompletionClient> CompletionReviewer<'a, C> {
    pub fn new(client: &'a C, narrator: &'a dyn Narrator, params: StageParams) -> Self {
        Self {
            client,
            narrator,
            params,
        }
    }

    fn render_prompt(&self, candidate: &Candidate, task: &Task) -> String {
        let mut env = Environment::new();
        env.add_template("reviewer", REVIEWER_TEMPLATE)
            .expect("reviewer template should be valid");
        let template = env
            .get_template("reviewer")
            .expect("reviewer template registered");
        let rendered = template
            .render(context! {
                code => candidate.code.as_str(),
                task => task.description.as_str(),
            })
            .expect("reviewer template rendering should not fail");
        rendered.trim().to_string()
    }

    fn fallback_verdict(&self, issues: Vec<String>) -> Verdict {
        if issues.is_empty() {
            self.narrator
                .announce(SPEAKER, "Basic checks passed. \u{2713}", Mood::Success);
            return Verdict {
                approved: true,
                feedback: "Basic checks passed".to_string(),
            };
        }
        let feedback = issues.join(", ");
        self.narrator
            .announce(SPEAKER, &format!("Found some issues:\n{feedback}"), Mood::Info);
        Verdict::rejected(feedback)
    }
}

impl<C: CompletionClient> Reviewer for CompletionReviewer<'_, C> {
    #[instrument(skip_all, fields(attempt = candidate.attempt))]
    fn review(&self, candidate: &Candidate, task: &Task) -> Verdict {
        self.narrator
            .announce(SPEAKER, "Reviewing code quality...", Mood::Thinking);

        let issues = find_issues(&candidate.code);

        // Review requests carry no system message; the instructions are the
        // whole conversation.
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(self.render_prompt(candidate, task))],
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        };

        match self.client.complete(&request) {
            Ok(raw) => {
                let review = raw.trim().to_string();
                if review.to_uppercase().contains(APPROVAL_TOKEN) {
                    debug!("candidate approved");
                    self.narrator
                        .announce(SPEAKER, "Code looks good to me! \u{2713}", Mood::Success);
                    Verdict {
                        approved: true,
                        feedback: "Looks good".to_string(),
                    }
                } else {
                    debug!(chars = review.len(), "candidate rejected");
                    self.narrator.announce(
                        SPEAKER,
                        &format!("Found some issues:\n{review}"),
                        Mood::Info,
                    );
                    Verdict::rejected(review)
                }
            }
            Err(err) => {
                warn!(err = %err, "review failed, falling back to local checks");
                self.narrator.announce(
                    SPEAKER,
                    &format!("Couldn't reach the review service: {err}\nRunning basic checks instead..."),
                    Mood::Thinking,
                );
                self.fallback_verdict(issues)
            }
        }
    }
}
