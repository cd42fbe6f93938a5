//! Test utilities for poll scenarios

use async_trait::async_trait;
use hubctl::api::response::{LogEntry, LogPage, NextPage, Paging};
use hubctl::api::{ApiError, Cursor, LogSource, StatusFetcher};
use hubctl::core::{OperationId, OperationKind, OperationState, PollOutcome, StatusSnapshot, SubOperation};
use hubctl::polling::{ChainHooks, PollError, ResultReporter, Stage};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

/// One scripted answer of a mock fetcher
#[derive(Debug, Clone)]
pub enum Scripted {
    State(OperationState),
    Snapshot(StatusSnapshot),
    HttpError(u16),
}

/// Fetcher that replays a script, repeating the last entry once exhausted
pub struct MockFetcher {
    kind: OperationKind,
    responses: Arc<Vec<Scripted>>,
    index: Arc<AtomicUsize>,
    fetch_delay: Option<Duration>,
    fetch_started: Mutex<Vec<Instant>>,
    origin: Instant,
}

impl MockFetcher {
    pub fn new(kind: OperationKind, responses: Vec<Scripted>) -> Self {
        Self {
            kind,
            responses: Arc::new(responses),
            index: Arc::new(AtomicUsize::new(0)),
            fetch_delay: None,
            fetch_started: Mutex::new(Vec::new()),
            origin: Instant::now(),
        }
    }

    /// Script of plain states
    pub fn states(kind: OperationKind, states: &[OperationState]) -> Self {
        Self::new(kind, states.iter().copied().map(Scripted::State).collect())
    }

    /// Make every fetch take `delay`
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Offsets from construction at which each fetch started
    pub fn fetch_offsets(&self) -> Vec<Duration> {
        self.fetch_started
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(self.origin))
            .collect()
    }
}

#[async_trait]
impl StatusFetcher for MockFetcher {
    async fn fetch_status(&self, operation_id: &OperationId) -> Result<StatusSnapshot, ApiError> {
        self.fetch_started.lock().unwrap().push(Instant::now());
        let idx = self.index.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .responses
            .get(idx)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or(Scripted::State(OperationState::Pending));

        match scripted {
            Scripted::State(state) => Ok(StatusSnapshot::new(operation_id.clone(), self.kind, state)),
            Scripted::Snapshot(snapshot) => Ok(snapshot),
            Scripted::HttpError(status) => Err(ApiError::http(status, "GET", "/status", "scripted failure")),
        }
    }
}

/// Build snapshot with named sub-builds
pub fn build_with_subs(id: u64, state: OperationState, subs: &[(&str, OperationState)]) -> StatusSnapshot {
    StatusSnapshot::new(id, OperationKind::Build, state).with_sub_operations(
        subs.iter()
            .map(|(name, state)| SubOperation::new(*name, *state))
            .collect(),
    )
}

/// Successful build snapshot that started a deploy task
pub fn build_with_auto_deploy(id: u64, deploy_id: Value) -> StatusSnapshot {
    StatusSnapshot::new(id, OperationKind::Build, OperationState::Success).with_raw(serde_json::json!({
        "status": "SUCCESS",
        "isAutoDeployEnabled": true,
        "deployStatusTaskLocator": { "id": deploy_id }
    }))
}

/// One scripted answer of a mock log source
#[derive(Debug, Clone)]
pub enum ScriptedPage {
    Page { ids: Vec<&'static str>, next: Option<&'static str> },
    NotFound,
    HttpError(u16),
}

pub fn log_entry(id: &str) -> LogEntry {
    LogEntry {
        id: id.into(),
        status: Some("SUCCESS".to_string()),
        execution_time: Some(3),
        created_at: Some(1_700_000_000_000),
        log: Some(format!("log {}", id)),
        error: None,
    }
}

/// Log source replaying pages, then empty pages
pub struct MockLogSource {
    latest: Option<&'static str>,
    pages: Vec<ScriptedPage>,
    index: AtomicUsize,
    cursors: Mutex<Vec<Option<Cursor>>>,
}

impl MockLogSource {
    pub fn new(latest: Option<&'static str>, pages: Vec<ScriptedPage>) -> Self {
        Self {
            latest,
            pages,
            index: AtomicUsize::new(0),
            cursors: Mutex::new(Vec::new()),
        }
    }

    /// Cursor passed to each page fetch, in order
    pub fn cursors(&self) -> Vec<Option<Cursor>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn fetch_latest(&self) -> Result<Option<LogEntry>, ApiError> {
        match self.latest {
            Some(id) => Ok(Some(log_entry(id))),
            None => Err(ApiError::http(404, "GET", "/latest", "not found")),
        }
    }

    async fn fetch_page(&self, after: Option<&Cursor>) -> Result<LogPage, ApiError> {
        self.cursors.lock().unwrap().push(after.cloned());
        let idx = self.index.fetch_add(1, Ordering::SeqCst);

        match self.pages.get(idx).cloned() {
            None => Ok(LogPage::empty()),
            Some(ScriptedPage::NotFound) => Err(ApiError::http(404, "GET", "/logs", "not found")),
            Some(ScriptedPage::HttpError(status)) => Err(ApiError::http(status, "GET", "/logs", "boom")),
            Some(ScriptedPage::Page { ids, next }) => Ok(LogPage {
                results: ids.into_iter().map(log_entry).collect(),
                paging: next.map(|after| Paging {
                    next: Some(NextPage {
                        after: Some(Cursor(after.to_string())),
                    }),
                }),
            }),
        }
    }
}

/// Reporter that records everything it is told
#[derive(Default)]
pub struct RecordingReporter {
    pub snapshots: Mutex<Vec<(OperationKind, OperationState)>>,
    pub log_ids: Mutex<Vec<String>>,
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn states(&self) -> Vec<OperationState> {
        self.snapshots.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }

    pub fn log_ids(&self) -> Vec<String> {
        self.log_ids.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ResultReporter for RecordingReporter {
    fn on_snapshot(&self, snapshot: &StatusSnapshot) {
        self.snapshots.lock().unwrap().push((snapshot.kind, snapshot.state));
    }

    fn on_log_page(&self, page: &LogPage) {
        self.log_ids
            .lock()
            .unwrap()
            .extend(page.results.iter().map(|e| e.id.to_string()));
    }
}

impl ChainHooks for RecordingReporter {
    fn stage_started(&self, stage: Stage, operation_id: &OperationId) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {:?} {}", stage, operation_id));
    }

    fn stage_finished(&self, stage: Stage, result: &Result<PollOutcome, PollError>) {
        let state = match result {
            Ok(outcome) => format!("{:?}", outcome.state()),
            Err(e) => format!("{:?}", e.state()),
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("finish {:?} {}", stage, state));
    }
}
