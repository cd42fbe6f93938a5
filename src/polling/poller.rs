//! Operation poller - drives one remote operation to a terminal state
//!
//! A poll is a loop of fetch → classify → delay-or-resolve:
//!
//! 1. the first fetch is issued immediately;
//! 2. each snapshot is reported, then classified;
//! 3. a terminal classification resolves the poll;
//! 4. otherwise the poller waits `interval` (clipped to the remaining
//!    timeout) and fetches again.
//!
//! Only one fetch is ever in flight per session. Cancellation and the
//! timeout are observed at scheduling boundaries, never by aborting a
//! fetch that already started.

use crate::api::{ApiError, StatusFetcher};
use crate::core::config::{PollingConfig, DEFAULT_POLL_INTERVAL_MS};
use crate::core::{
    Classification, OperationId, PollOutcome, SessionState, StandardClassifier, StatusSnapshot,
    TerminalClassifier,
};
use crate::polling::ResultReporter;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Polling configuration for a single session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between the end of one fetch and the start of the next
    pub interval: Duration,

    /// Ceiling on total poll duration
    pub timeout: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: None,
        }
    }
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&PollingConfig> for PollOptions {
    fn from(config: &PollingConfig) -> Self {
        PollOptions::new(config.interval()).with_timeout(config.timeout())
    }
}

/// Errors that reject a poll
#[derive(Debug, Error)]
pub enum PollError {
    /// The status fetch itself failed; never retried
    #[error("Status check #{attempts} for {operation_id} failed: {source}")]
    Transport {
        operation_id: OperationId,
        attempts: u32,
        #[source]
        source: ApiError,
    },

    /// The local ceiling elapsed before a terminal state was observed
    #[error("Timed out after {elapsed:.1?} waiting for {operation_id} ({attempts} status checks)")]
    TimedOut {
        operation_id: OperationId,
        attempts: u32,
        elapsed: Duration,
        last_snapshot: Option<Box<StatusSnapshot>>,
    },
}

impl PollError {
    pub fn state(&self) -> SessionState {
        match self {
            PollError::Transport { .. } => SessionState::Errored,
            PollError::TimedOut { .. } => SessionState::TimedOut,
        }
    }

    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            PollError::TimedOut { last_snapshot, .. } => last_snapshot.as_deref(),
            PollError::Transport { .. } => None,
        }
    }

    /// The underlying API error of a failed fetch
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            PollError::Transport { source, .. } => Some(source),
            PollError::TimedOut { .. } => None,
        }
    }
}

/// Mutable state of one poll, owned by the invoking call
#[derive(Debug)]
pub struct PollSession {
    pub session_id: Uuid,
    pub operation_id: OperationId,
    pub interval: Duration,
    pub started_at: DateTime<Utc>,
    pub attempts: u32,
    pub state: SessionState,
    pub last_snapshot: Option<StatusSnapshot>,
    started: Instant,
}

impl PollSession {
    fn new(operation_id: OperationId, options: &PollOptions) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            operation_id,
            interval: options.interval,
            started_at: Utc::now(),
            attempts: 0,
            state: SessionState::Started,
            last_snapshot: None,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid poll transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    fn cancel(mut self) -> PollOutcome {
        self.advance(SessionState::Cancelled);
        info!(
            session = %self.session_id,
            "Poll of {} cancelled after {} status checks",
            self.operation_id, self.attempts
        );
        PollOutcome::Cancelled {
            last_snapshot: self.last_snapshot,
        }
    }

    fn time_out(mut self) -> PollError {
        self.advance(SessionState::TimedOut);
        let elapsed = self.elapsed();
        warn!(
            session = %self.session_id,
            "Poll of {} timed out after {:?}",
            self.operation_id, elapsed
        );
        PollError::TimedOut {
            operation_id: self.operation_id,
            attempts: self.attempts,
            elapsed,
            last_snapshot: self.last_snapshot.map(Box::new),
        }
    }
}

/// Reusable poller, parameterized per call by fetcher and classifier
#[derive(Debug, Clone)]
pub struct Poller {
    options: PollOptions,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(options: PollOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next scheduling boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Poll with the standard terminal-state classifier
    pub async fn poll<F>(
        &self,
        fetcher: &F,
        operation_id: OperationId,
        reporter: &dyn ResultReporter,
    ) -> Result<PollOutcome, PollError>
    where
        F: StatusFetcher + ?Sized,
    {
        self.poll_with(fetcher, &StandardClassifier, operation_id, reporter)
            .await
    }

    /// Poll `operation_id` until `classifier` reports a terminal state
    pub async fn poll_with<F, C>(
        &self,
        fetcher: &F,
        classifier: &C,
        operation_id: OperationId,
        reporter: &dyn ResultReporter,
    ) -> Result<PollOutcome, PollError>
    where
        F: StatusFetcher + ?Sized,
        C: TerminalClassifier + ?Sized,
    {
        let mut session = PollSession::new(operation_id, &self.options);
        debug!(
            session = %session.session_id,
            "Polling {} every {:?} (timeout {:?})",
            session.operation_id, self.options.interval, self.options.timeout
        );

        if self.cancel.is_cancelled() {
            return Ok(session.cancel());
        }

        loop {
            session.advance(SessionState::Polling);
            session.attempts += 1;
            debug!(
                session = %session.session_id,
                attempt = session.attempts,
                "Fetching status of {}",
                session.operation_id
            );

            let snapshot = match fetcher.fetch_status(&session.operation_id).await {
                Ok(snapshot) => snapshot,
                Err(source) => {
                    session.advance(SessionState::Errored);
                    warn!(
                        session = %session.session_id,
                        "Status check for {} failed: {}",
                        session.operation_id, source
                    );
                    return Err(PollError::Transport {
                        operation_id: session.operation_id,
                        attempts: session.attempts,
                        source,
                    });
                }
            };

            reporter.on_snapshot(&snapshot);
            let classification = classifier.classify(&snapshot);

            match resolve(classification, snapshot) {
                Ok(outcome) => {
                    session.advance(classification.session_state());
                    info!(
                        session = %session.session_id,
                        "{} {} finished as {:?} after {} status checks",
                        session_kind(&outcome),
                        session.operation_id,
                        session.state,
                        session.attempts
                    );
                    if let Some(snapshot) = outcome.snapshot() {
                        debug!(session = %session.session_id, raw = %snapshot.raw, "Final snapshot");
                    }
                    return Ok(outcome);
                }
                Err(snapshot) => session.last_snapshot = Some(snapshot),
            }

            // Scheduling boundary
            let delay = match self.options.timeout {
                Some(timeout) => {
                    let elapsed = session.elapsed();
                    if elapsed >= timeout {
                        return Err(session.time_out());
                    }
                    self.options.interval.min(timeout - elapsed)
                }
                None => self.options.interval,
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(session.cancel()),
                _ = sleep(delay) => {}
            }

            if let Some(timeout) = self.options.timeout {
                if session.elapsed() >= timeout {
                    return Err(session.time_out());
                }
            }
        }
    }
}

/// Terminal classifications become outcomes; `Continue` hands the snapshot back
fn resolve(classification: Classification, snapshot: StatusSnapshot) -> Result<PollOutcome, StatusSnapshot> {
    match classification {
        Classification::Continue => Err(snapshot),
        Classification::Succeeded => Ok(PollOutcome::Succeeded(snapshot)),
        Classification::Failed => Ok(PollOutcome::Failed(snapshot)),
        Classification::PartiallyFailed => Ok(PollOutcome::PartiallyFailed(snapshot)),
    }
}

fn session_kind(outcome: &PollOutcome) -> String {
    outcome
        .snapshot()
        .map(|s| s.kind.to_string())
        .unwrap_or_else(|| "operation".to_string())
}
