//! JSON report of a finished run, written on request.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::metrics::edit_accuracy;
use crate::core::state::RunState;
use crate::core::types::{ModelTier, RunStop, TrajectoryEntry, VerificationResult};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub user_request: &'a str,
    pub workspace_root: PathBuf,
    pub stop: &'a RunStop,
    pub model_tier: ModelTier,
    pub loop_count: u32,
    pub edit_attempts: u32,
    pub edit_applied: u32,
    /// Percentage, absent when nothing was attempted.
    pub edit_accuracy: Option<f64>,
    pub latency_ms: &'a BTreeMap<String, u64>,
    pub verification: &'a VerificationResult,
    pub trajectory: &'a [TrajectoryEntry],
}

impl<'a> RunReport<'a> {
    pub fn new(state: &'a RunState, stop: &'a RunStop) -> Self {
        Self {
            user_request: state.user_request(),
            workspace_root: state.workspace_root().to_path_buf(),
            stop,
            model_tier: state.model_tier(),
            loop_count: state.loop_count(),
            edit_attempts: state.edit_attempts(),
            edit_applied: state.edit_applied(),
            edit_accuracy: edit_accuracy(state.edit_attempts(), state.edit_applied()),
            latency_ms: state.latency_breakdown(),
            verification: state.verification_result(),
            trajectory: state.trajectory(),
        }
    }
}

/// Write `report` as pretty JSON, creating parent directories.
pub fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(report).context("serialize run report")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
