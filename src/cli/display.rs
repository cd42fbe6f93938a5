//! Single-owner terminal status display
//!
//! Only one spinner may own the terminal at a time. A [`DisplaySlot`] hands
//! out at most one [`StatusDisplay`]; dropping the display, on any exit path,
//! clears an unfinished spinner and frees the slot again.

use crate::cli::output::{spinner_style, CHECK, CROSS};
use indicatif::{ProgressBar, ProgressDrawTarget};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisplayError {
    #[error("Another status display is already active")]
    Busy,
}

/// Exclusive right to draw a status line
#[derive(Debug)]
pub struct DisplaySlot {
    busy: AtomicBool,
}

/// The process-wide terminal slot
pub static TERMINAL: DisplaySlot = DisplaySlot::new();

impl DisplaySlot {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start a spinner drawing to stdout
    pub fn acquire(
        &'static self,
        message: impl Into<Cow<'static, str>>,
    ) -> Result<StatusDisplay, DisplayError> {
        self.acquire_with_target(message, ProgressDrawTarget::stdout())
    }

    /// Start a spinner that draws to `target`
    pub fn acquire_with_target(
        &'static self,
        message: impl Into<Cow<'static, str>>,
        target: ProgressDrawTarget,
    ) -> Result<StatusDisplay, DisplayError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DisplayError::Busy);
        }

        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(spinner_style());
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));

        Ok(StatusDisplay {
            bar,
            slot: self,
            finished: false,
        })
    }
}

impl Default for DisplaySlot {
    fn default() -> Self {
        Self::new()
    }
}

/// A live spinner owning its [`DisplaySlot`]
pub struct StatusDisplay {
    bar: ProgressBar,
    slot: &'static DisplaySlot,
    finished: bool,
}

impl StatusDisplay {
    pub fn set_message(&self, message: impl Into<Cow<'static, str>>) {
        self.bar.set_message(message);
    }

    /// Print a line above the spinner
    pub fn println(&self, line: impl AsRef<str>) {
        if self.bar.is_hidden() {
            println!("{}", line.as_ref());
        } else {
            self.bar.println(line);
        }
    }

    /// Run `f` with the spinner hidden
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// Finish with a success line
    pub fn succeed(mut self, message: impl AsRef<str>) {
        self.finish(format!("{}{}", CHECK, message.as_ref()));
    }

    /// Finish with a failure line
    pub fn fail(mut self, message: impl AsRef<str>) {
        self.finish(format!("{}{}", CROSS, message.as_ref()));
    }

    /// Remove the spinner without leaving a line behind
    pub fn clear(mut self) {
        self.bar.finish_and_clear();
        self.finished = true;
    }

    fn finish(&mut self, line: String) {
        self.bar.finish_and_clear();
        println!("{}", line);
        self.finished = true;
    }
}

impl Drop for StatusDisplay {
    fn drop(&mut self) {
        if !self.finished {
            self.bar.finish_and_clear();
        }
        self.slot.busy.store(false, Ordering::SeqCst);
    }
}
