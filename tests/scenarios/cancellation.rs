//! Test: cancellation at scheduling boundaries

use crate::helpers::*;
use hubctl::core::{ExitStatus, OperationKind, OperationState, PollOutcome, SessionState};
use hubctl::polling::{PollOptions, Poller};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

fn cancel_after(token: &CancellationToken, ms: u64) -> tokio::task::JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(ms)).await;
        token.cancel();
    })
}

/// Cancelling between fetch 2 and 3 means there is no fetch 3
#[tokio::test(start_paused = true)]
async fn test_cancel_between_fetches() {
    let fetcher = MockFetcher::states(OperationKind::Build, &[OperationState::Pending]);
    let token = CancellationToken::new();
    let poller = Poller::new(PollOptions::new(Duration::from_millis(100))).with_cancellation(token.clone());
    let canceller = cancel_after(&token, 150);

    let outcome = poller.poll(&fetcher, 1.into(), &RecordingReporter::default()).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(outcome.state(), SessionState::Cancelled);
    assert_eq!(outcome.exit_status(), ExitStatus::Success);
    match outcome {
        PollOutcome::Cancelled { last_snapshot } => {
            assert_eq!(last_snapshot.unwrap().state, OperationState::Pending)
        }
        other => panic!("Expected cancellation, got {:?}", other),
    }
}

/// A fetch already in flight completes and is reported
#[tokio::test(start_paused = true)]
async fn test_in_flight_fetch_is_not_aborted() {
    let fetcher = MockFetcher::states(OperationKind::Deploy, &[OperationState::InProgress])
        .with_fetch_delay(Duration::from_millis(50));
    let reporter = RecordingReporter::default();
    let token = CancellationToken::new();
    let poller = Poller::new(PollOptions::new(Duration::from_millis(100))).with_cancellation(token.clone());
    let canceller = cancel_after(&token, 20);

    let outcome = poller.poll(&fetcher, "d-1".into(), &reporter).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(reporter.states(), vec![OperationState::InProgress]);
    assert!(matches!(outcome, PollOutcome::Cancelled { last_snapshot: Some(_) }));
}

/// A terminal snapshot from an in-flight fetch still resolves normally
#[tokio::test(start_paused = true)]
async fn test_terminal_snapshot_wins_over_late_cancel() {
    let fetcher = MockFetcher::states(OperationKind::Build, &[OperationState::Failure])
        .with_fetch_delay(Duration::from_millis(50));
    let token = CancellationToken::new();
    let poller = Poller::new(PollOptions::default()).with_cancellation(token.clone());
    let canceller = cancel_after(&token, 10);

    let outcome = poller.poll(&fetcher, 3.into(), &RecordingReporter::default()).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome.state(), SessionState::Failed);
    assert_eq!(outcome.exit_status(), ExitStatus::Failure);
}

/// Sessions do not share cancellation
#[tokio::test(start_paused = true)]
async fn test_cancelling_one_session_leaves_others_running() {
    let cancelled = MockFetcher::states(OperationKind::Build, &[OperationState::Pending]);
    let finishing = MockFetcher::states(
        OperationKind::Deploy,
        &[OperationState::Pending, OperationState::Pending, OperationState::Success],
    );
    let token = CancellationToken::new();
    let cancellable = Poller::new(PollOptions::new(Duration::from_millis(10))).with_cancellation(token.clone());
    let independent = Poller::new(PollOptions::new(Duration::from_millis(10)));
    token.cancel();

    let reporter_a = RecordingReporter::default();
    let reporter_b = RecordingReporter::default();
    let (a, b) = tokio::join!(
        cancellable.poll(&cancelled, 1.into(), &reporter_a),
        independent.poll(&finishing, "d".into(), &reporter_b),
    );

    assert_eq!(a.unwrap().state(), SessionState::Cancelled);
    assert_eq!(cancelled.calls(), 0);
    assert!(b.unwrap().is_success());
    assert_eq!(finishing.calls(), 3);
}
