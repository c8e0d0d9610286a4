//! Verification adapter: the fixed check run after every plan that requests
//! no further actions.

use std::path::Path;

use tracing::info;

use crate::io::sandbox::{Sandbox, SandboxResult};

pub const DEFAULT_VERIFY_COMMAND: &str = "python -m pytest --tb=short -q";

pub trait Verifier {
    /// Run the check with `workdir` as working directory. Never fails: an
    /// un-runnable check is a failed check.
    fn verify(&self, workdir: &Path) -> SandboxResult;
}

impl<T: Verifier + ?Sized> Verifier for Box<T> {
    fn verify(&self, workdir: &Path) -> SandboxResult {
        (**self).verify(workdir)
    }
}

/// Runs a shell command through the [`Sandbox`].
#[derive(Debug, Clone)]
pub struct ShellVerifier {
    pub command: String,
    pub sandbox: Sandbox,
}

impl ShellVerifier {
    pub fn new(command: impl Into<String>, sandbox: Sandbox) -> Self {
        Self {
            command: command.into(),
            sandbox,
        }
    }
}

impl Verifier for ShellVerifier {
    fn verify(&self, workdir: &Path) -> SandboxResult {
        info!(command = %self.command, "running verification");
        self.sandbox.run(&self.command, workdir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_verifier_passes_on_zero_exit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verifier = ShellVerifier::new("exit 0", Sandbox::default());
        assert!(verifier.verify(temp.path()).passed);
    }

    #[test]
    fn shell_verifier_fails_on_nonzero_exit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verifier = ShellVerifier::new("echo broken; exit 1", Sandbox::default());
        let result = verifier.verify(temp.path());
        assert!(!result.passed);
        assert_eq!(result.output, "broken");
    }

    #[test]
    fn boxed_verifier_delegates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let verifier: Box<dyn Verifier> = Box::new(ShellVerifier::new("exit 0", Sandbox::default()));
        assert!(verifier.verify(temp.path()).passed);
    }
}
