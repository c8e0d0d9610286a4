//! Dispatch of requested actions and bookkeeping of their outcomes.

use tracing::{debug, instrument, warn};

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{ActionOutcome, Message, Phase, RequestedAction, TrajectoryEntry};
use crate::io::confirm::Confirmer;
use crate::io::sandbox::Sandbox;
use crate::tools::patch::{PatchRequest, search_replace};
use crate::tools::read::read_file;
use crate::tools::search::grep;
use crate::tools::shell::run_shell;
use crate::tools::write::write_file;
use crate::tools::{ActionKind, Workspace, bool_arg, opt_str_arg, str_arg};

/// Executes actions against one workspace.
pub struct ToolHarness<'a, C: ?Sized> {
    pub workspace: &'a Workspace,
    pub confirmer: &'a C,
    pub sandbox: &'a Sandbox,
}

impl<C: Confirmer + ?Sized> ToolHarness<'_, C> {
    /// Run one action. Every failure is reported in the outcome.
    #[instrument(skip_all, fields(action = %action.name, id = %action.id))]
    pub fn invoke(&self, action: &RequestedAction) -> ActionOutcome {
        let Some(kind) = ActionKind::from_name(&action.name) else {
            warn!("unknown action requested");
            return ActionOutcome::Error(format!("unknown action: {}", action.name));
        };
        if let Err(reason) = kind.validate_arguments(&action.arguments) {
            return ActionOutcome::Error(format!("invalid arguments for {}: {reason}", kind.name()));
        }
        match self.dispatch(kind, action) {
            Ok(outcome) => outcome,
            Err(reason) => ActionOutcome::Error(reason),
        }
    }

    fn dispatch(&self, kind: ActionKind, action: &RequestedAction) -> Result<ActionOutcome, String> {
        let args = &action.arguments;
        let outcome = match kind {
            ActionKind::Grep => grep(
                self.workspace,
                str_arg(args, "pattern")?,
                opt_str_arg(args, "path", "."),
            ),
            ActionKind::SearchReplace => search_replace(
                self.workspace,
                self.confirmer,
                &PatchRequest {
                    file_path: str_arg(args, "file_path")?,
                    old_string: str_arg(args, "old_string")?,
                    new_string: str_arg(args, "new_string")?,
                    replace_all: bool_arg(args, "replace_all"),
                },
            ),
            ActionKind::WriteFile => write_file(
                self.workspace,
                self.confirmer,
                str_arg(args, "file_path")?,
                str_arg(args, "content")?,
            ),
            ActionKind::ReadFile => read_file(self.workspace, str_arg(args, "file_path")?),
            ActionKind::RunShell => run_shell(
                self.workspace,
                self.sandbox,
                str_arg(args, "command")?,
                opt_str_arg(args, "cwd", "."),
            ),
        };
        Ok(outcome)
    }

    /// Run `actions` in order and fold their outcomes into one update.
    pub fn execute(&self, actions: &[RequestedAction]) -> StateUpdate {
        let mut update = StateUpdate::with_phase(Phase::Plan);
        for action in actions {
            let outcome = self.invoke(action);
            let (attempted, applied) = outcome.edit_counts();
            debug!(action = %action.name, outcome = outcome.label(), "action finished");
            update.edit_attempts_delta += attempted;
            update.edit_applied_delta += applied;
            update.trajectory.push(TrajectoryEntry::new(
                Phase::Act,
                action.name.clone(),
                outcome_summary(&outcome),
            ));
            update.messages.push(Message::action_result(action, outcome.render()));
        }
        update
    }
}

/// `label: first line of detail`, for the trajectory.
pub fn outcome_summary(outcome: &ActionOutcome) -> String {
    let first_line = outcome.detail().lines().next().unwrap_or_default();
    format!("{}: {first_line}", outcome.label())
}

/// Act node: execute the actions requested by the latest assistant message.
pub fn act_node<C: Confirmer + ?Sized>(state: &RunState, harness: &ToolHarness<'_, C>) -> StateUpdate {
    harness.execute(state.pending_actions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Role;
    use crate::io::confirm::{AutoConfirmer, ChangePreview};
    use serde_json::{Map, Value, json};
    use std::cell::RefCell;
    use std::fs;

    struct RecordingConfirmer {
        seen: RefCell<Vec<ChangePreview>>,
    }

    impl Confirmer for RecordingConfirmer {
        fn confirm(&self, preview: &ChangePreview) -> bool {
            self.seen.borrow_mut().push(preview.clone());
            true
        }
    }

    fn action(id: &str, name: &str, args: Value) -> RequestedAction {
        let arguments: Map<String, Value> = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        RequestedAction {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn execute_counts_and_records_each_action() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("sample.py"), "def greet():\n    pass\n").expect("write");
        let workspace = Workspace::new(temp.path()).expect("workspace");
        let sandbox = Sandbox::default();
        let confirmer = AutoConfirmer { approve: true };
        let harness = ToolHarness {
            workspace: &workspace,
            confirmer: &confirmer,
            sandbox: &sandbox,
        };

        let update = harness.execute(&[
            action("c1", "read_file", json!({"file_path": "sample.py"})),
            action(
                "c2",
                "search_replace",
                json!({"file_path": "sample.py", "old_string": "def greet", "new_string": "def hello"}),
            ),
            action(
                "c3",
                "search_replace",
                json!({"file_path": "sample.py", "old_string": "def missing", "new_string": "x"}),
            ),
            action("c4", "delete_everything", json!({})),
        ]);

        assert_eq!(update.phase, Some(Phase::Plan));
        assert_eq!(update.edit_attempts_delta, 2);
        assert_eq!(update.edit_applied_delta, 1);
        assert_eq!(update.messages.len(), 4);
        assert!(update.messages.iter().all(|m| m.role == Role::ActionResult));
        assert_eq!(update.messages[1].action_id.as_deref(), Some("c2"));
        assert_eq!(update.messages[1].text, "applied: patch written successfully");
        assert_eq!(update.messages[3].text, "error: unknown action: delete_everything");

        let details: Vec<&str> = update.trajectory.iter().map(|t| t.detail.as_str()).collect();
        assert_eq!(
            details,
            vec![
                "ok: def greet():",
                "applied: patch written successfully",
                "attempted: old_string not found in file (patch not applied)",
                "error: unknown action: delete_everything",
            ]
        );
        assert!(update.trajectory.iter().all(|t| t.phase == Phase::Act));
    }

    #[test]
    fn invalid_arguments_are_errors_before_dispatch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::new(temp.path()).expect("workspace");
        let sandbox = Sandbox::default();
        let confirmer = AutoConfirmer { approve: true };
        let harness = ToolHarness {
            workspace: &workspace,
            confirmer: &confirmer,
            sandbox: &sandbox,
        };
        let outcome = harness.invoke(&action("c1", "write_file", json!({"file_path": "a.txt"})));
        assert!(matches!(outcome, ActionOutcome::Error(ref d) if d.starts_with("invalid arguments for write_file")));
        assert!(!temp.path().join("a.txt").exists());
    }

    #[test]
    fn mutations_pass_through_the_confirmer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::new(temp.path()).expect("workspace");
        let sandbox = Sandbox::default();
        let confirmer = RecordingConfirmer {
            seen: RefCell::new(Vec::new()),
        };
        let harness = ToolHarness {
            workspace: &workspace,
            confirmer: &confirmer,
            sandbox: &sandbox,
        };
        let update = harness.execute(&[
            action("c1", "write_file", json!({"file_path": "new.txt", "content": "a\nb\n"})),
            action("c2", "grep", json!({"pattern": "a"})),
        ]);
        assert_eq!((update.edit_attempts_delta, update.edit_applied_delta), (1, 1));
        let seen = confirmer.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "new.txt");
        assert!(seen[0].body.contains("Total: 2 lines"));
    }
}
