//! Test-only collaborators: scripted engine, confirmer, verifier, reporter and
//! throwaway workspaces.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::core::state::RunState;
use crate::core::types::{NodeKind, RequestedAction, RunStop, TrajectoryEntry};
use crate::io::confirm::{ChangePreview, Confirmer};
use crate::io::engine::{EngineError, EngineReply, EngineRequest, ReasoningEngine};
use crate::io::reporter::Reporter;
use crate::io::sandbox::SandboxResult;
use crate::io::verifier::Verifier;

/// Build a requested action from a JSON object literal.
pub fn action(id: &str, name: &str, arguments: Value) -> RequestedAction {
    let arguments = match arguments {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    RequestedAction {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// Engine returning queued replies in order and recording every request.
///
/// Running out of replies is an [`EngineError`].
pub struct ScriptedEngine {
    replies: RefCell<VecDeque<Result<EngineReply, EngineError>>>,
    requests: RefCell<Vec<EngineRequest>>,
}

impl ScriptedEngine {
    pub fn new(replies: Vec<Result<EngineReply, EngineError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.borrow().clone()
    }

    pub fn assert_drained(&self) {
        let left = self.replies.borrow().len();
        assert_eq!(left, 0, "scripted engine has {left} unused replies");
    }
}

impl ReasoningEngine for ScriptedEngine {
    fn invoke(&self, request: &EngineRequest) -> Result<EngineReply, EngineError> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::new("scripted engine exhausted")))
    }
}

/// Confirmer answering from a queue, rejecting once the queue is empty.
#[derive(Default)]
pub struct ScriptedConfirmer {
    answers: RefCell<VecDeque<bool>>,
    seen: RefCell<Vec<ChangePreview>>,
}

impl ScriptedConfirmer {
    pub fn new(answers: Vec<bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn previews(&self) -> Vec<ChangePreview> {
        self.seen.borrow().clone()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, preview: &ChangePreview) -> bool {
        self.seen.borrow_mut().push(preview.clone());
        self.answers.borrow_mut().pop_front().unwrap_or(false)
    }
}

/// Verifier returning queued pass/fail results, then repeating the last one.
pub struct ScriptedVerifier {
    results: RefCell<VecDeque<bool>>,
    last: RefCell<bool>,
    calls: RefCell<u32>,
}

impl ScriptedVerifier {
    pub fn new(results: Vec<bool>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            last: RefCell::new(false),
            calls: RefCell::new(0),
        }
    }

    pub fn always(passed: bool) -> Self {
        Self::new(vec![passed])
    }

    pub fn calls(&self) -> u32 {
        *self.calls.borrow()
    }
}

impl Verifier for ScriptedVerifier {
    fn verify(&self, _workdir: &Path) -> SandboxResult {
        *self.calls.borrow_mut() += 1;
        if let Some(next) = self.results.borrow_mut().pop_front() {
            *self.last.borrow_mut() = next;
        }
        let passed = *self.last.borrow();
        SandboxResult {
            passed,
            output: if passed { "1 passed" } else { "1 failed" }.to_string(),
            exit_code: Some(if passed { 0 } else { 1 }),
            timed_out: false,
            duration_ms: 1,
        }
    }
}

/// Reporter capturing every event for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    nodes: RefCell<Vec<NodeKind>>,
    summaries: RefCell<Vec<RunStop>>,
    trajectories: RefCell<Vec<usize>>,
}

impl RecordingReporter {
    pub fn nodes(&self) -> Vec<NodeKind> {
        self.nodes.borrow().clone()
    }

    pub fn summaries(&self) -> Vec<RunStop> {
        self.summaries.borrow().clone()
    }

    /// Length of each dumped trajectory.
    pub fn trajectory_lengths(&self) -> Vec<usize> {
        self.trajectories.borrow().clone()
    }
}

impl Reporter for RecordingReporter {
    fn state_transition(&self, node: NodeKind, _state: &RunState) {
        self.nodes.borrow_mut().push(node);
    }

    fn summary(&self, _state: &RunState, stop: &RunStop) {
        self.summaries.borrow_mut().push(stop.clone());
    }

    fn trajectory(&self, entries: &[TrajectoryEntry]) {
        self.trajectories.borrow_mut().push(entries.len());
    }
}

/// Temporary workspace directory, removed on drop.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.root().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}
