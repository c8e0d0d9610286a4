//! Plan node: ask the reasoning engine for the next move.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::state::{MODEL_MS, RunState, StateUpdate};
use crate::core::types::{Message, Phase, TrajectoryEntry};
use crate::io::engine::{ActionSpec, EngineRequest, ReasoningEngine};
use crate::io::prompt::{PromptInputs, render_system_prompt};
use crate::io::retrieve::list_workspace_files;

/// Build the engine request for the current state.
///
/// The conversation starts with the user request; it is prepended here on the
/// first call and persisted by [`plan_node`].
pub fn build_request(
    state: &RunState,
    actions: &[ActionSpec],
    verify_command: &str,
) -> Result<EngineRequest> {
    let files = list_workspace_files(state.workspace_root());
    let system = render_system_prompt(
        state,
        &PromptInputs {
            actions,
            workspace_files: &files,
            verify_command,
        },
    )?;
    let mut messages = vec![Message::system(system)];
    if state.conversation().is_empty() {
        messages.push(Message::user(state.user_request()));
    } else {
        messages.extend(state.conversation().iter().cloned());
    }
    Ok(EngineRequest {
        tier: state.model_tier(),
        messages,
        actions: actions.to_vec(),
    })
}

/// Invoke the engine once and record its reply.
///
/// Engine failures are returned as errors wrapping
/// [`EngineError`](crate::io::engine::EngineError) and end the run.
#[instrument(skip_all, fields(tier = state.model_tier().as_str(), loop_count = state.loop_count()))]
pub fn plan_node<E: ReasoningEngine + ?Sized>(
    state: &RunState,
    engine: &E,
    actions: &[ActionSpec],
    verify_command: &str,
) -> Result<StateUpdate> {
    let request = build_request(state, actions, verify_command)?;

    let started = Instant::now();
    let reply = engine.invoke(&request).context("plan: invoke reasoning engine")?;
    let model_ms = started.elapsed().as_millis() as u64;
    debug!(model_ms, actions = reply.actions.len(), "engine replied");

    let next = if reply.actions.is_empty() {
        Phase::Observe
    } else {
        Phase::Act
    };
    let mut messages = Vec::new();
    if state.conversation().is_empty() {
        messages.push(Message::user(state.user_request()));
    }
    messages.push(Message::assistant(reply.text, reply.actions));

    Ok(StateUpdate {
        messages,
        ..StateUpdate::with_phase(next)
            .add_latency(MODEL_MS, model_ms)
            .record(TrajectoryEntry::new(
                Phase::Plan,
                "llm_call",
                format!("model_tier={}", state.model_tier().as_str()),
            ))
    })
}
