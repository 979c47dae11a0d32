//! Bounded-retry multi-agent coding pipeline.
//!
//! A coordinator delegates a natural-language coding task to a generator
//! agent, has a reviewer agent inspect the candidate, and executes approved
//! candidates in an isolated interpreter sandbox, feeding classified failures
//! back into the next generation for a bounded number of attempts. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (types, review heuristics,
//!   report classification). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting boundaries (completion service, sandbox
//!   process, console narration, artifacts, configuration).
//! - **[`agents`]**: The three pipeline roles behind trait seams, composing
//!   `core` logic with `io` boundaries.
//!
//! The [`pipeline`] module coordinates the roles into the attempt loop that
//! backs the CLI commands.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
