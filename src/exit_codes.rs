//! Stable exit codes for roundtable CLI commands.

/// Command succeeded; for `demo`/`run`, the task completed.
pub const OK: i32 = 0;
/// Invalid configuration/usage or an internal error.
pub const INVALID: i32 = 1;
/// The task failed after exhausting the attempt budget.
pub const TASK_FAILED: i32 = 2;
