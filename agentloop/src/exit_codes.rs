//! Stable exit codes for the agentloop CLI.

/// The run completed (verified or not, unless `--strict-exit`).
pub const OK: i32 = 0;
/// Invalid configuration or a fatal error such as an engine transport failure.
pub const INVALID: i32 = 1;
/// `--strict-exit` was given and verification never passed.
pub const UNVERIFIED: i32 = 2;
/// Interrupted by Ctrl-C outside a confirmation prompt (128 + SIGINT).
pub const INTERRUPTED: i32 = 130;
