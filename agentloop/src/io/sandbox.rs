//! Sandbox executor: run a shell command under a workspace directory.
//!
//! Failures of the environment (missing cwd, spawn errors, timeouts) are
//! reported inside [`SandboxResult`] and never surface as errors.

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::io::process::run_command_with_timeout;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxResult {
    pub passed: bool,
    pub output: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl SandboxResult {
    fn failed(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            passed: false,
            output: output.into(),
            exit_code: None,
            timed_out: false,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl Sandbox {
    pub fn new(timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }

    /// Run `command` through `sh -c` with `cwd` as working directory.
    ///
    /// `output` is stdout followed by stderr, trimmed; an empty capture is
    /// replaced by `(exit code N)`.
    #[instrument(skip(self), fields(cwd = %cwd.display()))]
    pub fn run(&self, command: &str, cwd: &Path) -> SandboxResult {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;
        if !cwd.is_dir() {
            return SandboxResult::failed("cwd does not exist", elapsed_ms());
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(cwd);
        let output = match run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
        {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %err, "sandbox command could not run");
                return SandboxResult::failed(format!("failed to run command: {err:#}"), elapsed_ms());
            }
        };

        let duration_ms = output.elapsed.as_millis() as u64;
        if output.timed_out {
            return SandboxResult {
                timed_out: true,
                ..SandboxResult::failed(
                    format!("Timeout after {}s", self.timeout.as_secs()),
                    duration_ms,
                )
            };
        }

        let exit_code = output.status.code();
        let text = output.combined_text().trim().to_string();
        let text = if text.is_empty() {
            match exit_code {
                Some(code) => format!("(exit code {code})"),
                None => "(terminated by signal)".to_string(),
            }
        } else {
            text
        };
        debug!(?exit_code, duration_ms, "sandbox command finished");
        SandboxResult {
            passed: output.status.success(),
            output: text,
            exit_code,
            timed_out: false,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_command_reports_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result = Sandbox::default().run("echo hi", temp.path());
        assert!(result.passed);
        assert_eq!(result.output, "hi");
        assert_eq!(result.exit_code, Some(0));
    }

    #[test]
    fn multi_command_script_times_out_on_schedule() {
        let temp = tempfile::tempdir().expect("tempdir");
        let started = Instant::now();
        let result = Sandbox::new(Duration::from_secs(1), 1000).run("sleep 6; echo after", temp.path());
        assert!(result.timed_out);
        assert!(!result.passed);
        assert_eq!(result.output, "Timeout after 1s");
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "sandbox blocked {:?} past a 1s timeout",
            started.elapsed()
        );
    }

    #[test]
    fn silent_failure_reports_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result = Sandbox::default().run("exit 3", temp.path());
        assert!(!result.passed);
        assert_eq!(result.output, "(exit code 3)");
    }

    #[test]
    fn runs_in_given_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "x").expect("write");
        let result = Sandbox::default().run("ls", temp.path());
        assert!(result.output.contains("marker.txt"));
    }

    #[test]
    fn missing_cwd_fails_without_running() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result = Sandbox::default().run("echo hi", &temp.path().join("nope"));
        assert!(!result.passed);
        assert_eq!(result.output, "cwd does not exist");
    }

    #[test]
    fn timeout_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(Duration::from_secs(1), 1000);
        let result = sandbox.run("sleep 5", temp.path());
        assert!(!result.passed);
        assert!(result.timed_out);
        assert_eq!(result.output, "Timeout after 1s");
    }
}
