//! `search_replace`: verbatim patch of an existing file, behind the
//! confirmation gate.

use std::fs;

use tracing::info;

use crate::core::types::ActionOutcome;
use crate::io::confirm::{ChangePreview, Confirmer};
use crate::io::diff::unified_diff;
use crate::tools::Workspace;

#[derive(Debug, Clone, Copy)]
pub struct PatchRequest<'a> {
    pub file_path: &'a str,
    pub old_string: &'a str,
    pub new_string: &'a str,
    pub replace_all: bool,
}

pub fn search_replace<C: Confirmer + ?Sized>(
    workspace: &Workspace,
    confirmer: &C,
    request: &PatchRequest<'_>,
) -> ActionOutcome {
    let file_path = request.file_path;
    let path = match workspace.resolve(file_path) {
        Ok(path) => path,
        Err(err) => return ActionOutcome::Error(err.to_string()),
    };
    if !path.exists() {
        return ActionOutcome::Error(format!("file not found: {file_path}"));
    }
    if !path.is_file() {
        return ActionOutcome::Error(format!("not a file: {file_path}"));
    }
    if request.old_string.is_empty() {
        return ActionOutcome::Error("old_string must not be empty".to_string());
    }
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => return ActionOutcome::Error(format!("could not read file: {err}")),
    };
    if !content.contains(request.old_string) {
        return ActionOutcome::NotApplied(
            "old_string not found in file (patch not applied)".to_string(),
        );
    }

    let patched = if request.replace_all {
        content.replace(request.old_string, request.new_string)
    } else {
        content.replacen(request.old_string, request.new_string, 1)
    };
    let rel = workspace.display(&path);
    let preview = ChangePreview {
        path: rel.clone(),
        question: format!("Apply patch to {rel}?"),
        body: unified_diff(&content, &patched, &rel),
    };
    if !confirmer.confirm(&preview) {
        return ActionOutcome::Rejected(format!("patch to {rel} rejected by user"));
    }
    if let Err(err) = fs::write(&path, patched) {
        return ActionOutcome::Error(format!("could not write file: {err}"));
    }
    info!(path = %rel, replace_all = request.replace_all, "patch applied");
    ActionOutcome::Applied("patch written successfully".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::confirm::AutoConfirmer;

    const APPROVE: AutoConfirmer = AutoConfirmer { approve: true };
    const REJECT: AutoConfirmer = AutoConfirmer { approve: false };

    fn setup(body: &str) -> (tempfile::TempDir, Workspace) {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("sample.py"), body).expect("write");
        let ws = Workspace::new(temp.path()).expect("workspace");
        (temp, ws)
    }

    fn request<'a>(old: &'a str, new: &'a str, replace_all: bool) -> PatchRequest<'a> {
        PatchRequest {
            file_path: "sample.py",
            old_string: old,
            new_string: new,
            replace_all,
        }
    }

    #[test]
    fn replaces_first_occurrence_only_by_default() {
        let (temp, ws) = setup("a a a\n");
        let outcome = search_replace(&ws, &APPROVE, &request("a", "b", false));
        assert_eq!(outcome, ActionOutcome::Applied("patch written successfully".to_string()));
        assert_eq!(fs::read_to_string(temp.path().join("sample.py")).expect("read"), "b a a\n");
    }

    #[test]
    fn replace_all_replaces_every_occurrence() {
        let (temp, ws) = setup("a a a\n");
        search_replace(&ws, &APPROVE, &request("a", "b", true));
        assert_eq!(fs::read_to_string(temp.path().join("sample.py")).expect("read"), "b b b\n");
    }

    #[test]
    fn absent_old_string_never_mutates() {
        let (temp, ws) = setup("def greet():\n    pass\n");
        let outcome = search_replace(&ws, &APPROVE, &request("def hello", "def x", false));
        assert!(matches!(outcome, ActionOutcome::NotApplied(_)));
        assert_eq!(
            fs::read_to_string(temp.path().join("sample.py")).expect("read"),
            "def greet():\n    pass\n"
        );
    }

    #[test]
    fn rejection_leaves_file_untouched() {
        let (temp, ws) = setup("def greet():\n");
        let outcome = search_replace(&ws, &REJECT, &request("greet", "hello", false));
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(fs::read_to_string(temp.path().join("sample.py")).expect("read"), "def greet():\n");
    }

    #[test]
    fn missing_file_and_empty_old_string_are_errors() {
        let (_temp, ws) = setup("x");
        let missing = PatchRequest {
            file_path: "nope.py",
            ..request("x", "y", false)
        };
        assert_eq!(
            search_replace(&ws, &APPROVE, &missing),
            ActionOutcome::Error("file not found: nope.py".to_string())
        );
        assert!(matches!(
            search_replace(&ws, &APPROVE, &request("", "y", false)),
            ActionOutcome::Error(_)
        ));
    }
}
