//! I/O adapters for the agent loop.

pub mod command_engine;
pub mod config;
pub mod confirm;
pub mod diff;
pub mod engine;
pub mod http_engine;
pub mod interrupt;
pub mod process;
pub mod prompt;
pub mod reporter;
pub mod retrieve;
pub mod run_report;
pub mod sandbox;
pub mod verifier;
