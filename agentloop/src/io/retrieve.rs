//! Keyword retrieval of workspace excerpts for the planning prompt.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::core::path::display_relative;
use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{Phase, clip_chars};

/// Extensions scanned for context.
pub const CONTEXT_EXTENSIONS: &[&str] = &["py", "md", "txt", "rs", "toml"];
const MAX_KEYWORDS: usize = 10;
const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalLimits {
    /// Snippets kept at most.
    pub max_snippets: usize,
    /// Budget over the summed excerpt lengths, in chars.
    pub max_chars: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            max_snippets: 15,
            max_chars: 8000,
        }
    }
}

/// Lowercased whitespace tokens longer than two chars, first ten.
pub fn keywords(request: &str) -> Vec<String> {
    request
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
        .take(MAX_KEYWORDS)
        .collect()
}

/// Rank context files by keyword hits and return `"[rel]\n<excerpt>"` snippets.
///
/// Ties are broken by relative path so the result is deterministic. A root that
/// is not a directory yields nothing; unreadable files are skipped.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn retrieve(root: &Path, request: &str, limits: &RetrievalLimits) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }
    let keywords = keywords(request);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, String, String)> = Vec::new();
    for entry in visible_files(root) {
        let has_context_ext = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| CONTEXT_EXTENSIONS.contains(&ext));
        if !has_context_ext {
            continue;
        }
        let Ok(bytes) = fs::read(entry.path()) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        let lowered = text.to_lowercase();
        let score = keywords.iter().filter(|k| lowered.contains(k.as_str())).count();
        if score == 0 {
            continue;
        }
        let excerpt = clip_chars(&text, EXCERPT_CHARS).replace('\n', " ");
        scored.push((score, display_relative(root, entry.path()), excerpt));
    }
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut snippets = Vec::new();
    let mut total_chars = 0usize;
    for (_, rel, excerpt) in scored {
        let len = excerpt.chars().count();
        if total_chars + len > limits.max_chars || snippets.len() >= limits.max_snippets {
            break;
        }
        snippets.push(format!("[{rel}]\n{excerpt}"));
        total_chars += len;
    }
    debug!(count = snippets.len(), total_chars, "retrieved context");
    snippets
}

/// Sorted workspace-relative paths of every visible file.
pub fn list_workspace_files(root: &Path) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<String> = visible_files(root)
        .map(|entry| display_relative(root, entry.path()))
        .collect();
    files.sort();
    files
}

/// Files under `root`, in file-name order, skipping hidden entries below the root.
fn visible_files(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Retriever node: replace the context snippets and return to planning.
pub fn retrieve_node(state: &RunState, limits: &RetrievalLimits) -> StateUpdate {
    StateUpdate {
        context_snippets: Some(retrieve(state.workspace_root(), state.user_request(), limits)),
        ..StateUpdate::with_phase(Phase::Plan)
    }
}
