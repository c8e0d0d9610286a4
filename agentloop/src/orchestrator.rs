//! The plan → act → verify → observe state machine.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::core::budget::{DEFAULT_STEP_BUDGET, StepCounter, check_step_budget};
use crate::core::invariants::validate_run_invariants;
use crate::core::metrics::format_latency_breakdown;
use crate::core::observe::{DEFAULT_MAX_LOOPS, observe_node};
use crate::core::router::{RouterPolicy, route_node};
use crate::core::state::RunState;
use crate::core::types::{NodeKind, Phase, RunStop};
use crate::io::config::AgentConfig;
use crate::io::confirm::Confirmer;
use crate::io::engine::ReasoningEngine;
use crate::io::reporter::Reporter;
use crate::io::retrieve::{RetrievalLimits, retrieve_node};
use crate::io::sandbox::Sandbox;
use crate::io::verifier::{DEFAULT_VERIFY_COMMAND, Verifier};
use crate::plan::plan_node;
use crate::tools::harness::{ToolHarness, act_node};
use crate::tools::{Workspace, action_specs};
use crate::verify::verify_node;

/// Limits and policies for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub max_loops: u32,
    /// Node executions allowed before the run is cut short.
    pub step_budget: u32,
    pub router: RouterPolicy,
    pub retrieval: RetrievalLimits,
    /// Shown to the engine; the verifier owns the command actually run.
    pub verify_command: String,
    /// Used by `run_shell` actions.
    pub sandbox: Sandbox,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_loops: DEFAULT_MAX_LOOPS,
            step_budget: DEFAULT_STEP_BUDGET,
            router: RouterPolicy::default(),
            retrieval: RetrievalLimits::default(),
            verify_command: DEFAULT_VERIFY_COMMAND.to_string(),
            sandbox: Sandbox::default(),
        }
    }
}

impl From<&AgentConfig> for RunConfig {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            max_loops: cfg.max_loops,
            step_budget: cfg.recursion_limit,
            router: cfg.router.clone(),
            retrieval: cfg.retrieval.clone(),
            verify_command: cfg.verify_command.clone(),
            sandbox: cfg.sandbox(),
        }
    }
}

/// Final state of a run and why it stopped.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: RunState,
    pub stop: RunStop,
    pub steps_used: u32,
}

impl RunOutcome {
    pub fn verified(&self) -> bool {
        self.stop == RunStop::Verified
    }
}

/// Drive one request through the graph until Observe finishes it or the step
/// budget runs out.
///
/// Budgets too small for one plan/act cycle are rejected up front with a
/// [`StepBudgetError`](crate::core::budget::StepBudgetError). Engine failures
/// abort the run; every other failure is absorbed into the state.
#[instrument(skip_all, fields(workspace = %workspace_root.display(), step_budget = config.step_budget))]
pub fn run_agent<E, V, C, R>(
    user_request: &str,
    workspace_root: &Path,
    config: &RunConfig,
    engine: &E,
    verifier: &V,
    confirmer: &C,
    reporter: &R,
) -> Result<RunOutcome>
where
    E: ReasoningEngine + ?Sized,
    V: Verifier + ?Sized,
    C: Confirmer + ?Sized,
    R: Reporter + ?Sized,
{
    check_step_budget(config.step_budget)?;
    if config.max_loops == 0 {
        bail!("max_loops must be > 0");
    }
    let workspace = Workspace::new(workspace_root)?;
    let harness = ToolHarness {
        workspace: &workspace,
        confirmer,
        sandbox: &config.sandbox,
    };
    let actions = action_specs();

    let mut state = RunState::new(user_request, workspace.root());
    let mut steps = StepCounter::new(config.step_budget);
    let mut node = NodeKind::Router;
    let stop = loop {
        if !steps.take() {
            warn!(budget = config.step_budget, "step budget exhausted");
            break RunStop::StepBudgetExhausted {
                steps: steps.used(),
                budget: config.step_budget,
            };
        }
        reporter.state_transition(node, &state);

        let update = match node {
            NodeKind::Router => route_node(&state, &config.router),
            NodeKind::Retriever => retrieve_node(&state, &config.retrieval),
            NodeKind::Plan => plan_node(&state, engine, &actions, &config.verify_command)?,
            NodeKind::Act => act_node(&state, &harness),
            NodeKind::Verify => verify_node(&state, verifier),
            NodeKind::Observe => observe_node(&state, config.max_loops),
        };
        state
            .apply(update)
            .with_context(|| format!("merge {} update", node.as_str()))?;

        node = match node {
            NodeKind::Router => NodeKind::Retriever,
            NodeKind::Retriever => NodeKind::Plan,
            NodeKind::Plan if state.pending_actions().is_empty() => NodeKind::Verify,
            NodeKind::Plan => NodeKind::Act,
            NodeKind::Act => NodeKind::Plan,
            NodeKind::Verify => NodeKind::Observe,
            NodeKind::Observe if state.phase() == Phase::Plan => NodeKind::Plan,
            NodeKind::Observe if state.verification_result().passed => break RunStop::Verified,
            NodeKind::Observe => break RunStop::LoopLimit {
                max_loops: config.max_loops,
            },
        };
    };

    for violation in validate_run_invariants(&state, config.max_loops) {
        warn!(%violation, "run invariant violated");
    }
    info!(
        stop = %stop.describe(),
        loops = state.loop_count(),
        edits_applied = state.edit_applied(),
        edits_attempted = state.edit_attempts(),
        latency = %format_latency_breakdown(state.latency_breakdown()),
        "run finished"
    );
    reporter.summary(&state, &stop);
    reporter.trajectory(state.trajectory());

    Ok(RunOutcome {
        state,
        stop,
        steps_used: steps.used(),
    })
}
