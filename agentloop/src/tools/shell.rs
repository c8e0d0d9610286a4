//! `run_shell`: run a command in the sandbox.

use crate::core::types::ActionOutcome;
use crate::io::sandbox::Sandbox;
use crate::tools::Workspace;

pub fn run_shell(workspace: &Workspace, sandbox: &Sandbox, command: &str, cwd: &str) -> ActionOutcome {
    let dir = match workspace.resolve(cwd) {
        Ok(dir) => dir,
        Err(err) => return ActionOutcome::Error(err.to_string()),
    };
    let result = sandbox.run(command, &dir);
    ActionOutcome::Info(format!("exit_ok={}\n{}", result.passed, result.output))
}
