//! Continuation-token tailing poller
//!
//! Follows a paged log feed: every fetch reports its entries immediately
//! and yields the cursor for the next fetch. There is no terminal remote
//! state; the tail runs until its cancellation token fires.

use crate::api::{ApiError, Cursor, LogPage, LogSource};
use crate::core::config::DEFAULT_TAIL_INTERVAL_MS;
use crate::polling::ResultReporter;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a finished tail observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailSummary {
    /// Page fetches issued
    pub fetches: u32,
    /// Log entries reported
    pub entries: usize,
    /// Cursor the next fetch would have used
    pub cursor: Option<Cursor>,
}

/// Poller for cursor-paged log feeds
#[derive(Debug, Clone)]
pub struct TailPoller {
    interval: Duration,
    cancel: CancellationToken,
}

impl Default for TailPoller {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TAIL_INTERVAL_MS))
    }
}

impl TailPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cursor positioned after the latest existing entry
    ///
    /// A 404 means nothing was ever logged, so the tail starts from the top.
    pub async fn initial_cursor<S>(source: &S) -> Result<Option<Cursor>, ApiError>
    where
        S: LogSource + ?Sized,
    {
        match source.fetch_latest().await {
            Ok(latest) => Ok(latest.map(|entry| entry.cursor())),
            Err(e) if e.is_not_found() => {
                debug!("No latest log yet, tailing from the start");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Tail from the latest entry until cancelled
    pub async fn tail<S>(&self, source: &S, reporter: &dyn ResultReporter) -> Result<TailSummary, ApiError>
    where
        S: LogSource + ?Sized,
    {
        let cursor = Self::initial_cursor(source).await?;
        self.follow(source, cursor, reporter).await
    }

    /// Tail from an explicit cursor until cancelled
    pub async fn follow<S>(
        &self,
        source: &S,
        mut cursor: Option<Cursor>,
        reporter: &dyn ResultReporter,
    ) -> Result<TailSummary, ApiError>
    where
        S: LogSource + ?Sized,
    {
        let mut summary = TailSummary::default();

        while !self.cancel.is_cancelled() {
            summary.fetches += 1;
            let page = match source.fetch_page(cursor.as_ref()).await {
                Ok(page) => page,
                Err(e) if e.is_not_found() => {
                    debug!("No logs yet for cursor {:?}", cursor);
                    LogPage::empty()
                }
                Err(e) => return Err(e),
            };

            if !page.is_empty() {
                summary.entries += page.results.len();
                reporter.on_log_page(&page);
            }
            if let Some(next) = page.next_cursor() {
                cursor = Some(next.clone());
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!(
            "Stopped following logs after {} fetches ({} entries)",
            summary.fetches, summary.entries
        );
        summary.cursor = cursor;
        Ok(summary)
    }
}
