//! Closed set of workspace actions and the harness that executes them.

pub mod harness;
pub mod patch;
pub mod read;
pub mod search;
pub mod shell;
pub mod write;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsonschema::Draft;
use serde_json::{Map, Value, json};

use crate::core::path::{PathEscape, contain, display_relative};
use crate::io::engine::ActionSpec;

/// Every action the engine may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Grep,
    SearchReplace,
    WriteFile,
    ReadFile,
    RunShell,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Grep,
        ActionKind::SearchReplace,
        ActionKind::WriteFile,
        ActionKind::ReadFile,
        ActionKind::RunShell,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Grep => "grep",
            ActionKind::SearchReplace => "search_replace",
            ActionKind::WriteFile => "write_file",
            ActionKind::ReadFile => "read_file",
            ActionKind::RunShell => "run_shell",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ActionKind::Grep => {
                "Search file contents under a workspace directory. Returns up to 100 \
                 `path:line: text` rows. Invalid regexes are matched literally."
            }
            ActionKind::SearchReplace => {
                "Replace `old_string` with `new_string` in an existing file. `old_string` \
                 must match the file verbatim; set `replace_all` to replace every occurrence."
            }
            ActionKind::WriteFile => "Create or overwrite a file with `content`.",
            ActionKind::ReadFile => "Return the full text of a file.",
            ActionKind::RunShell => {
                "Run a shell command (e.g. tests) in the workspace and return its exit \
                 status and output."
            }
        }
    }

    fn parameters(self) -> Value {
        match self {
            ActionKind::Grep => json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Regex or literal text."},
                    "path": {"type": "string", "description": "Directory to search, default `.`."}
                },
                "required": ["pattern"]
            }),
            ActionKind::SearchReplace => json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string"},
                    "old_string": {"type": "string"},
                    "new_string": {"type": "string"},
                    "replace_all": {"type": "boolean", "default": false}
                },
                "required": ["file_path", "old_string", "new_string"]
            }),
            ActionKind::WriteFile => json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["file_path", "content"]
            }),
            ActionKind::ReadFile => json!({
                "type": "object",
                "properties": {"file_path": {"type": "string"}},
                "required": ["file_path"]
            }),
            ActionKind::RunShell => json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string"},
                    "cwd": {"type": "string", "description": "Working directory, default `.`."}
                },
                "required": ["command"]
            }),
        }
    }

    pub fn spec(self) -> ActionSpec {
        ActionSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    /// Check `arguments` against this action's JSON Schema (Draft 2020-12).
    pub fn validate_arguments(self, arguments: &Map<String, Value>) -> Result<(), String> {
        let schema = self.parameters();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|err| format!("invalid schema for {}: {err}", self.name()))?;
        let instance = Value::Object(arguments.clone());
        let messages: Vec<String> = validator
            .iter_errors(&instance)
            .map(|err| err.to_string())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(messages.join("; "))
        }
    }
}

/// Schemas for every action, in declaration order.
pub fn action_specs() -> Vec<ActionSpec> {
    ActionKind::ALL.into_iter().map(ActionKind::spec).collect()
}

/// The directory every action is confined to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Canonicalizes `root`, which must exist.
    pub fn new(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("resolve workspace {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an untrusted relative path inside the workspace.
    ///
    /// Rejects lexical escapes and paths whose deepest existing ancestor is a
    /// symlink leading outside the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathEscape> {
        let path = contain(&self.root, relative)?;
        let mut ancestor = Some(path.as_path());
        while let Some(candidate) = ancestor {
            if fs::symlink_metadata(candidate).is_ok() {
                let inside = candidate
                    .canonicalize()
                    .is_ok_and(|real| real.starts_with(&self.root));
                if !inside {
                    return Err(PathEscape(relative.to_string()));
                }
                break;
            }
            ancestor = candidate.parent();
        }
        Ok(path)
    }

    pub fn display(&self, path: &Path) -> String {
        display_relative(&self.root, path)
    }
}

pub(crate) fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing string argument `{key}`"))
}

pub(crate) fn opt_str_arg<'a>(args: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

pub(crate) fn bool_arg(args: &Map<String, Value>, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}
