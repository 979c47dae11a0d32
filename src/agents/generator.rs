//! Code-writing agent backed by the completion service.

use minijinja::{Environment, context};
use tracing::{debug, instrument, warn};

use crate::agents::Generator;
use crate::core::types::{Candidate, Task};
use crate::io::completion::{ChatMessage, CompletionClient, CompletionRequest};
use crate::io::config::StageParams;
use crate::io::console::{Mood, Narrator};

pub const SPEAKER: &str = "Coder";

const CODER_TEMPLATE: &str = include_str!("prompts/coder.md");
const SYSTEM_PROMPT: &str = "You're a Python expert. Write clean code.";

/// Generator that asks the completion service for candidate code.
pub struct CompletionGenerator<'a, C: CompletionClient> {
    client: &'a C,
    narrator: &'a dyn Narrator,
    params: StageParams,
    /// Ask for a deliberately incomplete first candidate. Demo only; the
    /// retry path needs something to fix.
    demo_gap: bool,
}

impl<'a, C: CompletionClient> CompletionGenerator<'a, C> {
    pub fn new(
        client: &'a C,
        narrator: &'a dyn Narrator,
        params: StageParams,
        demo_gap: bool,
    ) -> Self {
        Self {
            client,
            narrator,
            params,
            demo_gap,
        }
    }

    fn render_instructions(&self, task: &Task, attempt: u32, prior_error: Option<&str>) -> String {
        let mut env = Environment::new();
        env.add_template("coder", CODER_TEMPLATE)
            .expect("coder template should be valid");
        let template = env.get_template("coder").expect("coder template registered");
        let rendered = template
            .render(context! {
                task => task.description.as_str(),
                prior_error => prior_error,
                demo_gap => self.demo_gap && attempt == 1 && prior_error.is_none(),
            })
            .expect("coder template rendering should not fail");
        rendered.trim().to_string()
    }
}

impl<C: CompletionClient> Generator for CompletionGenerator<'_, C> {
    #[instrument(skip_all, fields(attempt, retry = prior_error.is_some()))]
    fn generate(&self, task: &Task, attempt: u32, prior_error: Option<&str>) -> Candidate {
        match prior_error {
            Some(err) => self.narrator.announce(
                SPEAKER,
                &format!("Oops, that didn't work. Let me fix it...\nError was: {err}"),
                Mood::Thinking,
            ),
            None => self.narrator.announce(
                SPEAKER,
                &format!("Attempt #{attempt}: Writing code for '{}'", task.description),
                Mood::Thinking,
            ),
        }

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(self.render_instructions(task, attempt, prior_error)),
            ],
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        };

        let code = match self.client.complete(&request) {
            Ok(raw) => {
                let code = strip_code_fences(&raw);
                debug!(chars = code.len(), "candidate generated");
                self.narrator.announce(
                    SPEAKER,
                    &format!("Here's what I wrote:\n\n{code}"),
                    Mood::Code,
                );
                code
            }
            Err(err) => {
                warn!(err = %err, "completion failed, substituting placeholder");
                self.narrator
                    .announce(SPEAKER, &format!("Couldn't generate code: {err}"), Mood::Error);
                format!("# Error: {err}")
            }
        };

        Candidate { code, attempt }
    }
}

/// Drop markdown fence marker lines from a raw completion.
fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingNarrator, ScriptedCompletion};

    fn task() -> Task {
        Task::new("Write a Python function that calculates the 10th Fibonacci number")
    }

    #[test]
    fn strips_fence_lines_from_completion() {
        let client = ScriptedCompletion::replies(vec![
            "```python\ndef fibonacci(n):\n    return n\nresult = fibonacci(10)\n```".to_string(),
        ]);
        let narrator = RecordingNarrator::default();
        let generator =
            CompletionGenerator::new(&client, &narrator, StageParams::default(), false);

        let candidate = generator.generate(&task(), 1, None);

        assert!(!candidate.code.contains("```"));
        assert!(candidate.code.starts_with("def fibonacci"));
        assert_eq!(candidate.attempt, 1);
    }

    #[test]
    fn remote_failure_yields_placeholder_candidate() {
        let client = ScriptedCompletion::failing("connection refused");
        let narrator = RecordingNarrator::default();
        let generator =
            CompletionGenerator::new(&client, &narrator, StageParams::default(), false);

        let candidate = generator.generate(&task(), 1, None);

        assert!(candidate.code.starts_with("# Error:"));
        assert!(candidate.code.contains("connection refused"));
    }

    #[test]
    fn retry_instructions_embed_prior_error_verbatim() {
        let client = ScriptedCompletion::replies(vec!["result = 55".to_string()]);
        let narrator = RecordingNarrator::default();
        let generator =
            CompletionGenerator::new(&client, &narrator, StageParams::default(), false);

        let detail = "Variable or function not found: name 'fib' is not defined";
        generator.generate(&task(), 2, Some(detail));

        let requests = client.requests.borrow();
        let user_message = &requests[0].messages[1].content;
        assert!(user_message.contains(detail));
        assert!(user_message.contains("Original task:"));
    }

    #[test]
    fn demo_gap_only_shapes_the_first_attempt() {
        let client = ScriptedCompletion::replies(vec![
            "# TODO\npass".to_string(),
            "result = 55".to_string(),
        ]);
        let narrator = RecordingNarrator::default();
        let generator = CompletionGenerator::new(&client, &narrator, StageParams::default(), true);

        generator.generate(&task(), 1, None);
        generator.generate(&task(), 2, Some("Code looks incomplete (has TODO)"));

        let requests = client.requests.borrow();
        assert!(requests[0].messages[1].content.contains("make it incomplete"));
        assert!(!requests[1].messages[1].content.contains("make it incomplete"));
    }

    #[test]
    fn system_message_and_sampling_params_are_sent() {
        let client = ScriptedCompletion::replies(vec!["result = 55".to_string()]);
        let narrator = RecordingNarrator::default();
        let params = StageParams {
            temperature: 0.7,
            max_tokens: 800,
        };
        let generator = CompletionGenerator::new(&client, &narrator, params, false);

        generator.generate(&task(), 1, None);

        let requests = client.requests.borrow();
        assert_eq!(requests[0].messages[0].content, SYSTEM_PROMPT);
        assert_eq!(requests[0].max_tokens, 800);
    }
}
