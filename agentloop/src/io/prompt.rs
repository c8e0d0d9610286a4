//! System prompt rendering for the plan node.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::state::RunState;
use crate::core::types::clip_chars;
use crate::io::engine::ActionSpec;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Context snippets included, most recent first in retrieval order.
pub const MAX_PROMPT_SNIPPETS: usize = 10;
/// Workspace files listed in the prompt.
pub const MAX_PROMPT_FILES: usize = 20;
const MAX_VERIFICATION_CHARS: usize = 2000;

/// Inputs gathered outside the run state.
#[derive(Debug, Clone)]
pub struct PromptInputs<'a> {
    pub actions: &'a [ActionSpec],
    pub workspace_files: &'a [String],
    pub verify_command: &'a str,
}

pub fn render_system_prompt(state: &RunState, inputs: &PromptInputs<'_>) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("system", SYSTEM_TEMPLATE)
        .context("load system prompt template")?;
    let template = env.get_template("system").context("get system prompt template")?;

    let snippets = state.context_snippets();
    let context_blob = if snippets.is_empty() {
        "(no context)".to_string()
    } else {
        snippets
            .iter()
            .take(MAX_PROMPT_SNIPPETS)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let files = if inputs.workspace_files.is_empty() {
        "none".to_string()
    } else {
        inputs
            .workspace_files
            .iter()
            .take(MAX_PROMPT_FILES)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let verification = state.verification_result();
    let verification = (state.loop_count() > 0 && !verification.passed)
        .then(|| clip_chars(verification.output.trim(), MAX_VERIFICATION_CHARS));

    let actions: Vec<_> = inputs
        .actions
        .iter()
        .map(|a| context! { name => a.name, description => a.description })
        .collect();
    let rendered = template
        .render(context! {
            actions => actions,
            files => files,
            context => context_blob,
            verify_command => inputs.verify_command,
            verification => verification,
            loop_count => state.loop_count(),
        })
        .context("render system prompt")?;
    Ok(rendered)
}
