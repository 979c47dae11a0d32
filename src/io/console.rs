//! Console narration boundary.
//!
//! Narration is product output: the demo is watched, not scraped, and the
//! agents "speak" through this trait. It is distinct from `tracing`
//! diagnostics (stderr, for operators) and from attempt artifacts (disk,
//! for inspection). Implementations must never influence control flow.

/// Tone of an announcement, rendered as a glyph by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Info,
    Success,
    Error,
    Code,
    Thinking,
    Working,
}

impl Mood {
    fn glyph(self) -> &'static str {
        match self {
            Self::Info => "\u{1f4ac}",     // speech balloon
            Self::Success => "\u{2705}",   // check mark
            Self::Error => "\u{274c}",     // cross mark
            Self::Code => "\u{1f4bb}",     // laptop
            Self::Thinking => "\u{1f914}", // thinking face
            Self::Working => "\u{2699}\u{fe0f}", // gear
        }
    }
}

/// Something the agents can speak through.
pub trait Narrator {
    fn announce(&self, speaker: &str, text: &str, mood: Mood);
}

/// Renders announcements to stdout with a glyph header and rule lines.
#[derive(Debug, Default)]
pub struct ConsoleNarrator;

impl Narrator for ConsoleNarrator {
    fn announce(&self, speaker: &str, text: &str, mood: Mood) {
        println!("\n{} {}", mood.glyph(), speaker);
        println!("{}", "-".repeat(50));
        println!("{text}");
        println!("{}", "-".repeat(50));
    }
}
