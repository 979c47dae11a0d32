//! I/O helpers and process boundaries for the pipeline.

pub mod completion;
pub mod config;
pub mod console;
pub mod process;
pub mod readme;
pub mod sandbox;
pub mod session_log;
