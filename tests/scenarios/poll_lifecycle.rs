//! Test: fetch → report → classify → delay-or-resolve

use crate::helpers::*;
use hubctl::core::{ExitStatus, OperationKind, OperationState, PollOutcome, SessionState};
use hubctl::polling::{PollOptions, Poller};
use tokio::time::{Duration, Instant};

fn poller(interval_ms: u64) -> Poller {
    Poller::new(PollOptions::new(Duration::from_millis(interval_ms)))
}

/// k non-terminal snapshots followed by a terminal one take k+1 fetches
#[tokio::test(start_paused = true)]
async fn test_pending_in_progress_success() {
    let fetcher = MockFetcher::states(
        OperationKind::Build,
        &[OperationState::Pending, OperationState::InProgress, OperationState::Success],
    );
    let reporter = RecordingReporter::default();

    let start = Instant::now();
    let outcome = poller(10).poll(&fetcher, 42.into(), &reporter).await.unwrap();

    assert!(matches!(outcome, PollOutcome::Succeeded(_)));
    assert_eq!(outcome.exit_status(), ExitStatus::Success);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(20));

    // every snapshot reported, in fetch order
    assert_eq!(
        reporter.states(),
        vec![OperationState::Pending, OperationState::InProgress, OperationState::Success]
    );
}

#[tokio::test(start_paused = true)]
async fn test_many_pending_snapshots() {
    for k in [0usize, 1, 5] {
        let mut script = vec![OperationState::Pending; k];
        script.push(OperationState::Success);
        let fetcher = MockFetcher::states(OperationKind::Deploy, &script);

        poller(50).poll(&fetcher, "d".into(), &RecordingReporter::default()).await.unwrap();

        assert_eq!(fetcher.calls(), k + 1);
    }
}

/// The interval runs from the end of one fetch to the start of the next
#[tokio::test(start_paused = true)]
async fn test_fetches_never_overlap() {
    let fetcher = MockFetcher::states(
        OperationKind::Build,
        &[OperationState::Pending, OperationState::Pending, OperationState::Success],
    )
    .with_fetch_delay(Duration::from_millis(5));

    poller(10).poll(&fetcher, 1.into(), &RecordingReporter::default()).await.unwrap();

    assert_eq!(
        fetcher.fetch_offsets(),
        vec![
            Duration::ZERO,
            Duration::from_millis(15),
            Duration::from_millis(30)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failure_with_failed_sub_operation_is_partial() {
    let snapshot = build_with_subs(
        9,
        OperationState::Failure,
        &[("a", OperationState::Failure), ("b", OperationState::Success)],
    );
    let fetcher = MockFetcher::new(OperationKind::Build, vec![Scripted::Snapshot(snapshot)]);

    let outcome = poller(10).poll(&fetcher, 9.into(), &RecordingReporter::default()).await.unwrap();

    assert_eq!(outcome.state(), SessionState::PartiallyFailed);
    assert_eq!(outcome.exit_status(), ExitStatus::Failure);
    let failed: Vec<_> = outcome.failed_sub_operations().iter().map(|s| s.name.clone()).collect();
    assert_eq!(failed, vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_sub_operations_is_failed() {
    let fetcher = MockFetcher::states(OperationKind::Validation, &[OperationState::Failure]);

    let outcome = poller(10).poll(&fetcher, "v".into(), &RecordingReporter::default()).await.unwrap();

    assert_eq!(outcome.state(), SessionState::Failed);
    assert!(outcome.is_failure());
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_rejects_without_retry() {
    let fetcher = MockFetcher::new(
        OperationKind::Build,
        vec![
            Scripted::State(OperationState::Pending),
            Scripted::HttpError(503),
            Scripted::State(OperationState::Success),
        ],
    );
    let reporter = RecordingReporter::default();

    let err = poller(10).poll(&fetcher, 1.into(), &reporter).await.unwrap_err();

    assert_eq!(err.state(), SessionState::Errored);
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(reporter.states(), vec![OperationState::Pending]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_status_keeps_polling() {
    let mystery = hubctl::core::OperationKind::Build
        .snapshot(1.into(), serde_json::json!({ "status": "SOMETHING_NEW" }))
        .unwrap();
    let fetcher = MockFetcher::new(
        OperationKind::Build,
        vec![Scripted::Snapshot(mystery), Scripted::State(OperationState::Success)],
    );

    let outcome = poller(10).poll(&fetcher, 1.into(), &RecordingReporter::default()).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(fetcher.calls(), 2);
}
