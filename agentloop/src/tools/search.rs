//! `grep`: search file contents under a workspace directory.

use std::fs;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::types::ActionOutcome;
use crate::tools::Workspace;

pub const MAX_MATCHES: usize = 100;

enum Matcher {
    Regex(Regex),
    Literal(String),
}

impl Matcher {
    fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => Matcher::Regex(regex),
            Err(err) => {
                debug!(err = %err, "invalid regex, matching literally");
                Matcher::Literal(pattern.to_string())
            }
        }
    }

    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Regex(regex) => regex.is_match(line),
            Matcher::Literal(text) => line.contains(text.as_str()),
        }
    }
}

/// Lines matching `pattern` in files under `path`, as `rel:line: text` rows.
///
/// Missing paths and empty results are informative text, not errors.
pub fn grep(workspace: &Workspace, pattern: &str, path: &str) -> ActionOutcome {
    let dir = match workspace.resolve(path) {
        Ok(dir) => dir,
        Err(err) => return ActionOutcome::Error(err.to_string()),
    };
    if !dir.exists() {
        return ActionOutcome::Info(format!("Path does not exist: {path}"));
    }
    if !dir.is_dir() {
        return ActionOutcome::Info(format!("Not a directory: {path}"));
    }

    let matcher = Matcher::new(pattern);
    let mut rows = Vec::new();
    let files = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());
    'files: for entry in files {
        let rel = workspace.display(entry.path());
        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(err) => {
                rows.push(format!("{rel}: (read error: {err})"));
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        for (idx, line) in text.lines().enumerate() {
            if matcher.is_match(line) {
                rows.push(format!("{rel}:{}: {}", idx + 1, line.trim()));
                if rows.len() >= MAX_MATCHES {
                    break 'files;
                }
            }
        }
    }

    if rows.is_empty() {
        return ActionOutcome::Info(format!("No matches for pattern '{pattern}' under {path}"));
    }
    ActionOutcome::Info(rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("pkg")).expect("mkdir");
        fs::write(temp.path().join("sample.py"), "def greet():\n    return 'hi'\n").expect("write");
        fs::write(temp.path().join("pkg/util.py"), "  greet()  \n").expect("write");
        let ws = Workspace::new(temp.path()).expect("workspace");
        (temp, ws)
    }

    #[test]
    fn finds_matches_with_relative_paths() {
        let (_temp, ws) = workspace();
        let outcome = grep(&ws, r"greet\(", ".");
        assert_eq!(
            outcome,
            ActionOutcome::Info("pkg/util.py:1: greet()\nsample.py:1: def greet():".to_string())
        );
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let (_temp, ws) = workspace();
        let outcome = grep(&ws, "greet(", ".");
        assert!(outcome.detail().contains("sample.py:1: def greet():"));
    }

    #[test]
    fn reports_missing_and_non_directory_paths() {
        let (_temp, ws) = workspace();
        assert_eq!(
            grep(&ws, "x", "nope"),
            ActionOutcome::Info("Path does not exist: nope".to_string())
        );
        assert_eq!(
            grep(&ws, "x", "sample.py"),
            ActionOutcome::Info("Not a directory: sample.py".to_string())
        );
    }

    #[test]
    fn reports_no_matches() {
        let (_temp, ws) = workspace();
        assert_eq!(
            grep(&ws, "absent", "pkg"),
            ActionOutcome::Info("No matches for pattern 'absent' under pkg".to_string())
        );
    }

    #[test]
    fn caps_result_rows() {
        let (temp, ws) = workspace();
        fs::write(temp.path().join("many.txt"), "hit\n".repeat(150)).expect("write");
        let outcome = grep(&ws, "hit", ".");
        assert_eq!(outcome.detail().lines().count(), MAX_MATCHES);
    }

    #[test]
    fn escaping_path_is_an_error() {
        let (_temp, ws) = workspace();
        assert!(matches!(grep(&ws, "x", ".."), ActionOutcome::Error(_)));
    }
}
