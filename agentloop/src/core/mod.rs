//! Deterministic, pure logic for the agent loop.
//!
//! Core modules are free of I/O side effects. They operate on in-memory state
//! and return deterministic outputs suitable for tests.

pub mod budget;
pub mod invariants;
pub mod metrics;
pub mod observe;
pub mod path;
pub mod router;
pub mod state;
pub mod types;
