//! Test: timeout ceiling

use crate::helpers::*;
use hubctl::core::{OperationKind, OperationState, SessionState};
use hubctl::polling::{PollError, PollOptions, Poller};
use tokio::time::Duration;

/// A timeout shorter than the interval still gets one fetch
#[tokio::test(start_paused = true)]
async fn test_timeout_shorter_than_interval() {
    let fetcher = MockFetcher::states(OperationKind::Build, &[OperationState::Pending]);
    let poller = Poller::new(
        PollOptions::new(Duration::from_millis(100)).with_timeout(Some(Duration::from_millis(30))),
    );

    let err = poller.poll(&fetcher, 1.into(), &RecordingReporter::default()).await.unwrap_err();

    assert_eq!(err.state(), SessionState::TimedOut);
    assert_eq!(fetcher.calls(), 1);
    match err {
        PollError::TimedOut { attempts, elapsed, .. } => {
            assert_eq!(attempts, 1);
            assert_eq!(elapsed, Duration::from_millis(30));
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
}

/// No fetch is started once the deadline has passed
#[tokio::test(start_paused = true)]
async fn test_no_fetch_after_deadline() {
    let fetcher = MockFetcher::states(OperationKind::Deploy, &[OperationState::InProgress])
        .with_fetch_delay(Duration::from_millis(40));
    let poller = Poller::new(
        PollOptions::new(Duration::from_millis(10)).with_timeout(Some(Duration::from_millis(30))),
    );

    let err = poller.poll(&fetcher, "d".into(), &RecordingReporter::default()).await.unwrap_err();

    // the first fetch alone outlasts the deadline
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(err.last_snapshot().map(|s| s.state), Some(OperationState::InProgress));
}

#[tokio::test(start_paused = true)]
async fn test_terminal_state_before_deadline_resolves() {
    let fetcher = MockFetcher::states(
        OperationKind::Validation,
        &[OperationState::Pending, OperationState::Success],
    );
    let poller = Poller::new(
        PollOptions::new(Duration::from_millis(10)).with_timeout(Some(Duration::from_millis(15))),
    );

    let outcome = poller.poll(&fetcher, "v".into(), &RecordingReporter::default()).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(fetcher.calls(), 2);
}
