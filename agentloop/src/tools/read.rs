//! `read_file`: return a workspace file's text.

use std::fs;

use crate::core::types::ActionOutcome;
use crate::tools::Workspace;

pub fn read_file(workspace: &Workspace, file_path: &str) -> ActionOutcome {
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
    match fs::read(&path) {
        Ok(bytes) => ActionOutcome::Info(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) => ActionOutcome::Error(format!("could not read file: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_text() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.py"), "x = 1\n").expect("write");
        let ws = Workspace::new(temp.path()).expect("workspace");
        assert_eq!(read_file(&ws, "a.py"), ActionOutcome::Info("x = 1\n".to_string()));
    }

    #[test]
    fn missing_directory_and_escape_are_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("dir")).expect("mkdir");
        let ws = Workspace::new(temp.path()).expect("workspace");
        assert_eq!(
            read_file(&ws, "nope.py"),
            ActionOutcome::Error("file not found: nope.py".to_string())
        );
        assert_eq!(
            read_file(&ws, "dir"),
            ActionOutcome::Error("not a file: dir".to_string())
        );
        assert!(matches!(read_file(&ws, "../x"), ActionOutcome::Error(_)));
    }
}
