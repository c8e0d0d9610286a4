//! Confirmation gate for workspace mutations.
//!
//! Every mutating action shows a [`ChangePreview`] to a [`Confirmer`] before it
//! touches disk. The strategy is picked explicitly by the caller.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{debug, warn};

use crate::io::diff::colorize_diff;
use crate::io::interrupt::InterruptFlag;

/// What the user is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePreview {
    /// Workspace-relative target path.
    pub path: String,
    /// One-line description, e.g. `Apply patch to sample.py?`.
    pub question: String,
    /// Unified diff or new-file preview.
    pub body: String,
}

pub trait Confirmer {
    /// `true` approves the change.
    fn confirm(&self, preview: &ChangePreview) -> bool;
}

impl<T: Confirmer + ?Sized> Confirmer for Box<T> {
    fn confirm(&self, preview: &ChangePreview) -> bool {
        (**self).confirm(preview)
    }
}

/// Answers every preview the same way without prompting.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirmer {
    pub approve: bool,
}

impl Confirmer for AutoConfirmer {
    fn confirm(&self, preview: &ChangePreview) -> bool {
        debug!(path = %preview.path, approve = self.approve, "auto-confirm");
        self.approve
    }
}

/// How often a waiting prompt checks for Ctrl-C.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

enum Answer {
    Line(String),
    Closed,
    Interrupted,
}

/// Prompts on a writer and reads one answer line per preview.
///
/// Empty input takes the default (yes); `y`/`yes` and `n`/`no` are accepted
/// case-insensitively; anything else falls back to the default. EOF, a read
/// error or Ctrl-C while waiting rejects.
///
/// Lines are read on a background thread so a blocked read cannot hold off an
/// interrupt.
pub struct LineConfirmer<W> {
    answers: Receiver<std::io::Result<String>>,
    writer: RefCell<W>,
    interrupt: InterruptFlag,
    default_yes: bool,
}

impl<W: Write> LineConfirmer<W> {
    pub fn new<R: BufRead + Send + 'static>(reader: R, writer: W) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || read_answers(reader, &tx));
        Self {
            answers: rx,
            writer: RefCell::new(writer),
            interrupt: InterruptFlag::new(),
            default_yes: true,
        }
    }

    /// Reject the pending change when `interrupt` fires during a prompt.
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn ask(&self, preview: &ChangePreview) -> Result<Answer> {
        {
            let mut writer = self.writer.borrow_mut();
            writeln!(writer, "\n{}", colorize_diff(&preview.body)).context("write preview")?;
            let hint = if self.default_yes { "[Y/n]" } else { "[y/N]" };
            write!(writer, "{} {hint} ", preview.question).context("write prompt")?;
            writer.flush().context("flush prompt")?;
        }

        self.interrupt.begin_prompt();
        let answer = self.wait_for_answer();
        self.interrupt.end_prompt();
        if matches!(answer, Ok(Answer::Interrupted)) {
            writeln!(self.writer.borrow_mut()).context("write newline")?;
        }
        answer
    }

    fn wait_for_answer(&self) -> Result<Answer> {
        loop {
            match self.answers.recv_timeout(INTERRUPT_POLL) {
                Ok(line) => return Ok(Answer::Line(line.context("read answer")?)),
                Err(RecvTimeoutError::Disconnected) => return Ok(Answer::Closed),
                Err(RecvTimeoutError::Timeout) if self.interrupt.is_interrupted() => {
                    return Ok(Answer::Interrupted);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

impl<W: Write> Confirmer for LineConfirmer<W> {
    fn confirm(&self, preview: &ChangePreview) -> bool {
        match self.ask(preview) {
            Ok(Answer::Line(answer)) => interpret_answer(&answer, self.default_yes),
            Ok(Answer::Closed) => {
                debug!(path = %preview.path, "confirmation input closed, rejecting");
                false
            }
            Ok(Answer::Interrupted) => {
                debug!(path = %preview.path, "confirmation interrupted, rejecting");
                false
            }
            Err(err) => {
                warn!(err = %err, "confirmation prompt failed, rejecting");
                false
            }
        }
    }
}

fn read_answers<R: BufRead>(mut reader: R, tx: &Sender<std::io::Result<String>>) {
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {
                if tx.send(Ok(line)).is_err() {
                    return;
                }
            }
            Err(err) => {
                // The receiver may already be gone; nothing else to report to.
                let _ = tx.send(Err(err));
                return;
            }
        }
    }
}

pub type TtyConfirmer = LineConfirmer<File>;
pub type StdinConfirmer = LineConfirmer<std::io::Stdout>;

/// Prompt on the controlling terminal, independent of redirected stdio.
pub fn tty_confirmer(interrupt: &InterruptFlag) -> Result<TtyConfirmer> {
    let input = File::open("/dev/tty")
        .context("open /dev/tty (no controlling terminal; use --confirm stdin, --yes or --confirm reject)")?;
    let output = OpenOptions::new()
        .write(true)
        .open("/dev/tty")
        .context("open /dev/tty for writing")?;
    Ok(LineConfirmer::new(BufReader::new(input), output).with_interrupt(interrupt.clone()))
}

/// Prompt on stdout and read answers from stdin.
pub fn stdin_confirmer(interrupt: &InterruptFlag) -> StdinConfirmer {
    LineConfirmer::new(BufReader::new(std::io::stdin()), std::io::stdout())
        .with_interrupt(interrupt.clone())
}

pub fn interpret_answer(answer: &str, default_yes: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default_yes,
    }
}

/// Confirmation channel selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfirmStrategy {
    /// Prompt on the controlling terminal.
    Tty,
    /// Prompt on stdout, answer on stdin.
    Stdin,
    /// Approve every change.
    Approve,
    /// Reject every change.
    Reject,
}

impl ConfirmStrategy {
    /// Interactive strategies reject the pending change when `interrupt`
    /// fires while they wait for an answer.
    pub fn build(self, interrupt: &InterruptFlag) -> Result<Box<dyn Confirmer>> {
        Ok(match self {
            ConfirmStrategy::Tty => Box::new(tty_confirmer(interrupt)?),
            ConfirmStrategy::Stdin => Box::new(stdin_confirmer(interrupt)),
            ConfirmStrategy::Approve => Box::new(AutoConfirmer { approve: true }),
            ConfirmStrategy::Reject => Box::new(AutoConfirmer { approve: false }),
        })
    }
}
