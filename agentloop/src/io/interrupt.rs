//! Ctrl-C handling for interactive confirmation.
//!
//! While a confirmation prompt waits for input, Ctrl-C rejects the change and
//! the run goes on. Anywhere else it ends the process with
//! [`exit_codes::INTERRUPTED`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

use crate::exit_codes;

#[derive(Debug, Default)]
struct Flags {
    prompting: AtomicBool,
    interrupted: AtomicBool,
}

/// Shared between the signal handler and the confirmers.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    flags: Arc<Flags>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process-wide Ctrl-C handler. Call at most once.
    pub fn install(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            if !flag.signal() {
                std::process::exit(exit_codes::INTERRUPTED);
            }
        })
        .context("install Ctrl-C handler")
    }

    /// Record an interrupt. Returns `false` when no prompt is waiting, in
    /// which case nothing is recorded.
    pub fn signal(&self) -> bool {
        if !self.flags.prompting.load(Ordering::SeqCst) {
            return false;
        }
        debug!("interrupt during confirmation prompt");
        self.flags.interrupted.store(true, Ordering::SeqCst);
        true
    }

    pub fn begin_prompt(&self) {
        self.flags.interrupted.store(false, Ordering::SeqCst);
        self.flags.prompting.store(true, Ordering::SeqCst);
    }

    /// Leave the prompt, returning whether it was interrupted.
    pub fn end_prompt(&self) -> bool {
        self.flags.prompting.store(false, Ordering::SeqCst);
        self.flags.interrupted.swap(false, Ordering::SeqCst)
    }

    pub fn is_interrupted(&self) -> bool {
        self.flags.interrupted.load(Ordering::SeqCst)
    }
}
