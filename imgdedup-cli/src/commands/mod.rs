//! Subcommand implementations.
//!
//! Each `execute` returns the process exit code on completion; failures are
//! returned as errors and classified in `main`.

pub mod compare;
pub mod evaluate;
pub mod hash;
pub mod import;
pub mod reset;
pub mod submit;
