//! Terminal reporter for poll sessions
//!
//! `TerminalReporter` renders poll results on the status spinner:
//!
//! - each snapshot replaces the spinner message with its progress line
//! - each log page is printed above the spinner
//! - build and deploy stages of a chain open and finish their own spinner

use crate::cli::display::{DisplayError, DisplaySlot, StatusDisplay, TERMINAL};
use crate::cli::output::{format_log_entry, format_snapshot_progress, ROCKET};
use crate::api::LogPage;
use crate::core::{OperationId, PollOutcome, StatusSnapshot};
use crate::polling::{ChainHooks, PollError, ResultReporter, Stage};
use console::style;
use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Reporter that draws on the process terminal
pub struct TerminalReporter {
    slot: &'static DisplaySlot,
    display: Mutex<Option<StatusDisplay>>,
    subject: String,
    target: Option<String>,
    compact_logs: bool,
}

impl TerminalReporter {
    /// Reporter for operations on `subject` (a project name, route, or path)
    pub fn new(subject: impl Into<String>) -> Self {
        Self::with_slot(&TERMINAL, subject)
    }

    pub fn with_slot(slot: &'static DisplaySlot, subject: impl Into<String>) -> Self {
        Self {
            slot,
            display: Mutex::new(None),
            subject: subject.into(),
            target: None,
            compact_logs: false,
        }
    }

    /// Account the operations run against, named in deploy announcements
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_compact_logs(mut self, compact: bool) -> Self {
        self.compact_logs = compact;
        self
    }

    fn display(&self) -> MutexGuard<'_, Option<StatusDisplay>> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the spinner
    pub fn start(&self, message: impl Into<Cow<'static, str>>) -> Result<(), DisplayError> {
        let mut display = self.display();
        if let Some(previous) = display.take() {
            previous.clear();
        }
        *display = Some(self.slot.acquire(message)?);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.display().is_some()
    }

    pub fn succeed(&self, message: impl AsRef<str>) {
        if let Some(display) = self.display().take() {
            display.succeed(message);
        }
    }

    pub fn fail(&self, message: impl AsRef<str>) {
        if let Some(display) = self.display().take() {
            display.fail(message);
        }
    }

    pub fn clear(&self) {
        if let Some(display) = self.display().take() {
            display.clear();
        }
    }

    fn stage_message(&self, stage: Stage, operation_id: &OperationId) -> String {
        match stage {
            Stage::Build => format!("Building #{} of {}", operation_id, style(&self.subject).bold()),
            Stage::Deploy => format!("Deploying {} ({})", style(&self.subject).bold(), operation_id),
        }
    }
}

impl ResultReporter for TerminalReporter {
    fn on_snapshot(&self, snapshot: &StatusSnapshot) {
        if let Some(display) = self.display().as_ref() {
            display.set_message(format_snapshot_progress(snapshot));
        }
    }

    fn on_log_page(&self, page: &LogPage) {
        let display = self.display();
        for entry in &page.results {
            let line = format_log_entry(entry, self.compact_logs);
            match display.as_ref() {
                Some(display) => display.println(line),
                None => println!("{}", line),
            }
        }
    }
}

impl ChainHooks for TerminalReporter {
    fn stage_started(&self, stage: Stage, operation_id: &OperationId) {
        if let (Stage::Deploy, Some(target)) = (stage, &self.target) {
            println!(
                "{}{} to {}",
                ROCKET,
                style("Automatically deploying").bold(),
                target
            );
        }
        if let Err(e) = self.start(self.stage_message(stage, operation_id)) {
            warn!("Cannot show progress for {}: {}", operation_id, e);
        }
    }

    fn stage_finished(&self, stage: Stage, result: &Result<PollOutcome, PollError>) {
        let noun = match stage {
            Stage::Build => "Build",
            Stage::Deploy => "Deploy",
        };

        match result {
            Ok(PollOutcome::Succeeded(snapshot)) => {
                self.succeed(format!("{} #{} succeeded", noun, snapshot.operation_id))
            }
            Ok(PollOutcome::Cancelled { .. }) => self.clear(),
            Ok(outcome) => {
                let id = outcome
                    .snapshot()
                    .map(|s| s.operation_id.to_string())
                    .unwrap_or_default();
                self.fail(format!("{} #{} failed", noun, id))
            }
            Err(PollError::TimedOut { operation_id, .. }) => {
                self.fail(format!("{} #{} timed out", noun, operation_id))
            }
            Err(PollError::Transport { operation_id, .. }) => {
                self.fail(format!("Could not check status of {} #{}", noun.to_lowercase(), operation_id))
            }
        }
    }
}
