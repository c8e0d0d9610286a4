//! Engine backed by an external command.
//!
//! The command runs through `sh -c`, receives the [`EngineRequest`] as JSON on
//! stdin and must print a reply JSON object on stdout:
//!
//! ```json
//! {"text": "...", "actions": [{"id": "c1", "name": "grep", "arguments": {"pattern": "x"}}]}
//! ```
//!
//! Both fields are optional; a missing action `id` is assigned from its position.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{RequestedAction, clip_chars};
use crate::io::engine::{EngineError, EngineReply, EngineRequest, ReasoningEngine};
use crate::io::process::run_command_with_timeout;

#[derive(Debug, Clone)]
pub struct CommandEngine {
    pub command: String,
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl ReasoningEngine for CommandEngine {
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs(), tier = request.tier.as_str()))]
    fn invoke(&self, request: &EngineRequest) -> Result<EngineReply, EngineError> {
        info!(command = %self.command, "invoking engine command");
        let input = serde_json::to_vec(request)
            .map_err(|err| EngineError::new(format!("serialize request: {err}")))?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command).current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, Some(&input), self.timeout, self.output_limit_bytes)
            .map_err(|err| EngineError::new(format!("run engine command: {err:#}")))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "engine command timed out");
            return Err(EngineError::new(format!(
                "engine command timed out after {}s",
                self.timeout.as_secs()
            )));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "engine command failed");
            return Err(EngineError::new(format!(
                "engine command exited with {:?}: {}",
                output.status.code(),
                clip_chars(String::from_utf8_lossy(&output.stderr).trim(), 500)
            )));
        }
        if output.stdout_truncated > 0 {
            return Err(EngineError::new(format!(
                "engine reply exceeded {} bytes",
                self.output_limit_bytes
            )));
        }

        let reply = parse_reply(&output.stdout)?;
        debug!(actions = reply.actions.len(), "engine command replied");
        Ok(reply)
    }
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    text: String,
    #[serde(default)]
    actions: Vec<WireAction>,
}

#[derive(Debug, Deserialize)]
struct WireAction {
    id: Option<String>,
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

fn parse_reply(stdout: &[u8]) -> Result<EngineReply, EngineError> {
    let wire: WireReply = serde_json::from_slice(stdout)
        .map_err(|err| EngineError::new(format!("parse engine reply: {err}")))?;
    let actions = wire
        .actions
        .into_iter()
        .enumerate()
        .map(|(idx, action)| RequestedAction {
            id: action.id.unwrap_or_else(|| format!("call-{}", idx + 1)),
            name: action.name,
            arguments: action.arguments,
        })
        .collect();
    Ok(EngineReply {
        text: wire.text,
        actions,
    })
}
