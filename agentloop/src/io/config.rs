//! Agent configuration stored in `agentloop.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::budget::{DEFAULT_STEP_BUDGET, check_step_budget, steps_for_loops};
use crate::core::observe::DEFAULT_MAX_LOOPS;
use crate::core::router::RouterPolicy;
use crate::io::retrieve::RetrievalLimits;
use crate::io::sandbox::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_OUTPUT_LIMIT_BYTES, Sandbox};
use crate::io::verifier::DEFAULT_VERIFY_COMMAND;

pub const DEFAULT_CONFIG_FILE: &str = "agentloop.toml";

/// Agent configuration (TOML).
///
/// Missing fields take their defaults, so an empty file is valid. CLI flags
/// override individual values after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Plan/act/verify loops before the run is stopped unverified.
    pub max_loops: u32,

    /// Node executions allowed per run.
    pub recursion_limit: u32,

    /// Shell command run in the workspace to verify the agent's work.
    pub verify_command: String,

    /// Wall-clock limit for sandboxed commands, in seconds.
    pub command_timeout_secs: u64,

    /// Per-stream capture limit for sandboxed commands.
    pub output_limit_bytes: usize,

    pub router: RouterPolicy,
    pub retrieval: RetrievalLimits,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub fast_model: String,
    pub high_model: String,
    pub timeout_secs: u64,
    /// Shell command for the command engine.
    pub command: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            fast_model: "gpt-4o-mini".to_string(),
            high_model: "gpt-4o".to_string(),
            timeout_secs: 120,
            command: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_loops: DEFAULT_MAX_LOOPS,
            recursion_limit: DEFAULT_STEP_BUDGET,
            verify_command: DEFAULT_VERIFY_COMMAND.to_string(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT.as_secs(),
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            router: RouterPolicy::default(),
            retrieval: RetrievalLimits::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Whether an unverified run can stop on `max_loops` rather than on the
    /// step budget.
    pub fn loop_limit_reachable(&self) -> bool {
        self.recursion_limit >= steps_for_loops(self.max_loops)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_loops == 0 {
            return Err(anyhow!("max_loops must be > 0"));
        }
        check_step_budget(self.recursion_limit)?;
        if !self.loop_limit_reachable() {
            warn!(
                recursion_limit = self.recursion_limit,
                max_loops = self.max_loops,
                needed = steps_for_loops(self.max_loops),
                "recursion limit ends unverified runs before max_loops is reached"
            );
        }
        if self.verify_command.trim().is_empty() {
            return Err(anyhow!("verify_command must be non-empty"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.retrieval.max_snippets == 0 {
            return Err(anyhow!("retrieval.max_snippets must be > 0"));
        }
        if self.engine.timeout_secs == 0 {
            return Err(anyhow!("engine.timeout_secs must be > 0"));
        }
        if self
            .engine
            .command
            .as_deref()
            .is_some_and(|cmd| cmd.trim().is_empty())
        {
            return Err(anyhow!("engine.command must be non-empty when set"));
        }
        Ok(())
    }

    pub fn sandbox(&self) -> Sandbox {
        Sandbox::new(
            Duration::from_secs(self.command_timeout_secs),
            self.output_limit_bytes,
        )
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let buf = render_config(cfg)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

pub fn render_config(cfg: &AgentConfig) -> Result<String> {
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    Ok(buf)
}
