//! `write_file`: create or overwrite a file, behind the confirmation gate.

use std::fs;

use tracing::info;

use crate::core::types::ActionOutcome;
use crate::io::confirm::{ChangePreview, Confirmer};
use crate::io::diff::{new_file_preview, unified_diff};
use crate::tools::Workspace;

pub fn write_file<C: Confirmer + ?Sized>(
    workspace: &Workspace,
    confirmer: &C,
    file_path: &str,
    content: &str,
) -> ActionOutcome {
    let path = match workspace.resolve(file_path) {
        Ok(path) => path,
        Err(err) => return ActionOutcome::Error(err.to_string()),
    };
    if path.is_dir() {
        return ActionOutcome::Error(format!("not a file: {file_path}"));
    }

    let rel = workspace.display(&path);
    let body = if path.exists() {
        let before = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => return ActionOutcome::Error(format!("could not read file: {err}")),
        };
        let diff = unified_diff(&before, content, &rel);
        if diff.is_empty() {
            "(no changes)".to_string()
        } else {
            diff
        }
    } else {
        new_file_preview(content, &rel)
    };
    let preview = ChangePreview {
        path: rel.clone(),
        question: format!("Write {rel}?"),
        body,
    };
    if !confirmer.confirm(&preview) {
        return ActionOutcome::Rejected(format!("write to {rel} rejected by user"));
    }

    if let Some(parent) = path.parent()
        && let Err(err) = fs::create_dir_all(parent)
    {
        return ActionOutcome::Error(format!("could not create directory: {err}"));
    }
    if let Err(err) = fs::write(&path, content) {
        return ActionOutcome::Error(format!("could not write file: {err}"));
    }
    info!(path = %rel, bytes = content.len(), "file written");
    ActionOutcome::Applied("file written successfully".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::confirm::AutoConfirmer;
    use crate::tools::read::read_file;

    const APPROVE: AutoConfirmer = AutoConfirmer { approve: true };

    #[test]
    fn write_then_read_returns_same_text() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ws = Workspace::new(temp.path()).expect("workspace");
        let content = "line one\nline two\n";
        let outcome = write_file(&ws, &APPROVE, "nested/dir/out.txt", content);
        assert_eq!(outcome, ActionOutcome::Applied("file written successfully".to_string()));
        assert_eq!(read_file(&ws, "nested/dir/out.txt"), ActionOutcome::Info(content.to_string()));
    }

    #[test]
    fn escaping_path_writes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("ws");
        fs::create_dir(&root).expect("mkdir");
        let ws = Workspace::new(&root).expect("workspace");
        let outcome = write_file(&ws, &APPROVE, "../outside.txt", "x");
        assert_eq!(
            outcome,
            ActionOutcome::Error("path must be inside workspace: ../outside.txt".to_string())
        );
        assert!(!temp.path().join("outside.txt").exists());
    }

    #[test]
    fn rejected_overwrite_keeps_old_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.txt"), "old\n").expect("write");
        let ws = Workspace::new(temp.path()).expect("workspace");
        let outcome = write_file(&ws, &AutoConfirmer { approve: false }, "a.txt", "new\n");
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(fs::read_to_string(temp.path().join("a.txt")).expect("read"), "old\n");
    }

    #[test]
    fn directory_target_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("dir")).expect("mkdir");
        let ws = Workspace::new(temp.path()).expect("workspace");
        assert!(matches!(write_file(&ws, &APPROVE, "dir", "x"), ActionOutcome::Error(_)));
    }
}
