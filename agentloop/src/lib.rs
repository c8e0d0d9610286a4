//! Plan → act → verify → observe coding agent confined to one workspace.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: pure, deterministic logic (run state and its merge rules,
//!   routing, termination, step budget, metrics). No I/O.
//! - **[`io`]**: side effects (processes, sandbox, engine backends,
//!   confirmation, config, reporting). Behind traits where tests swap them.
//! - **[`tools`]**: the closed action set and the harness that runs it.
//!
//! [`plan`], [`verify`] and [`orchestrator`] wire these into the agent loop.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
pub mod verify;
