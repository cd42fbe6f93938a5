//! Test: continuation-token log tailing

use crate::helpers::*;
use hubctl::api::Cursor;
use hubctl::polling::TailPoller;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

async fn tail_for(source: &MockLogSource, reporter: &RecordingReporter, run_ms: u64) -> hubctl::polling::TailSummary {
    let token = CancellationToken::new();
    let poller = TailPoller::new(Duration::from_millis(100)).with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        sleep(Duration::from_millis(run_ms)).await;
        token.cancel();
    });

    let summary = poller.tail(source, reporter).await.unwrap();
    canceller.await.unwrap();
    summary
}

/// Tailing starts after the latest entry and follows the returned cursors
#[tokio::test(start_paused = true)]
async fn test_tail_follows_cursors() {
    let source = MockLogSource::new(
        Some("log-0"),
        vec![
            ScriptedPage::Page { ids: vec!["log-1", "log-2"], next: Some("c1") },
            ScriptedPage::Page { ids: vec![], next: None },
            ScriptedPage::Page { ids: vec!["log-3"], next: Some("c2") },
        ],
    );
    let reporter = RecordingReporter::default();

    let summary = tail_for(&source, &reporter, 350).await;

    assert_eq!(summary.fetches, 4);
    assert_eq!(summary.entries, 3);
    assert_eq!(reporter.log_ids(), vec!["log-1", "log-2", "log-3"]);

    let c1 = Some(Cursor("c1".to_string()));
    assert_eq!(
        source.cursors(),
        vec![
            Some(Cursor::from_log_id("log-0")),
            c1.clone(),
            // a page without paging keeps the previous cursor
            c1,
            Some(Cursor("c2".to_string())),
        ]
    );
    assert_eq!(summary.cursor, Some(Cursor("c2".to_string())));
}

#[tokio::test]
async fn test_initial_cursor_is_base64_of_latest_id() {
    let source = MockLogSource::new(Some("abc"), vec![]);
    let cursor = TailPoller::initial_cursor(&source).await.unwrap();
    assert_eq!(cursor, Some(Cursor("YWJj".to_string())));
}

/// A route that never ran answers 404 everywhere; the tail keeps going
#[tokio::test(start_paused = true)]
async fn test_tail_of_never_executed_route() {
    let source = MockLogSource::new(None, vec![ScriptedPage::NotFound, ScriptedPage::NotFound]);
    let reporter = RecordingReporter::default();

    let summary = tail_for(&source, &reporter, 250).await;

    assert_eq!(summary.fetches, 3);
    assert_eq!(summary.entries, 0);
    assert_eq!(source.cursors()[0], None);
}

#[tokio::test(start_paused = true)]
async fn test_tail_stops_on_server_error() {
    let source = MockLogSource::new(
        Some("log-0"),
        vec![
            ScriptedPage::Page { ids: vec!["log-1"], next: None },
            ScriptedPage::HttpError(500),
        ],
    );
    let reporter = RecordingReporter::default();

    let err = TailPoller::new(Duration::from_millis(100))
        .tail(&source, &reporter)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(reporter.log_ids(), vec!["log-1"]);
}
