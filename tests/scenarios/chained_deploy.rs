//! Test: build followed by an automatically triggered deploy

use crate::helpers::*;
use hubctl::core::{ExitStatus, OperationKind, OperationState, SessionState};
use hubctl::polling::{poll_build_then_deploy, PollOptions, Poller};
use serde_json::json;
use tokio::time::Duration;

fn poller() -> Poller {
    Poller::new(PollOptions::new(Duration::from_millis(10)))
}

#[tokio::test(start_paused = true)]
async fn test_successful_build_chains_into_deploy() {
    let build = MockFetcher::new(
        OperationKind::Build,
        vec![
            Scripted::State(OperationState::InProgress),
            Scripted::Snapshot(build_with_auto_deploy(12, json!(345))),
        ],
    );
    let deploy = MockFetcher::states(
        OperationKind::Deploy,
        &[OperationState::Pending, OperationState::Success],
    );
    let hooks = RecordingReporter::default();

    let outcome = poll_build_then_deploy(&poller(), &build, &deploy, 12.into(), &hooks)
        .await
        .unwrap();

    assert!(outcome.build.is_success());
    assert!(outcome.deploy.as_ref().unwrap().is_success());
    assert_eq!(outcome.exit_status(), ExitStatus::Success);
    assert_eq!(build.calls(), 2);
    assert_eq!(deploy.calls(), 2);
    assert_eq!(
        hooks.events(),
        vec![
            "start Build 12",
            "finish Build Succeeded",
            "start Deploy 345",
            "finish Deploy Succeeded"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_deploy_fails_the_chain() {
    let build = MockFetcher::new(
        OperationKind::Build,
        vec![Scripted::Snapshot(build_with_auto_deploy(2, json!("task-9")))],
    );
    let deploy = MockFetcher::states(OperationKind::Deploy, &[OperationState::Failure]);

    let outcome = poll_build_then_deploy(&poller(), &build, &deploy, 2.into(), &RecordingReporter::default())
        .await
        .unwrap();

    assert_eq!(outcome.deploy.as_ref().map(|d| d.state()), Some(SessionState::Failed));
    assert_eq!(outcome.exit_status(), ExitStatus::Failure);
}

#[tokio::test(start_paused = true)]
async fn test_build_without_auto_deploy_stops() {
    let build = MockFetcher::states(OperationKind::Build, &[OperationState::Success]);
    let deploy = MockFetcher::states(OperationKind::Deploy, &[OperationState::Success]);
    let hooks = RecordingReporter::default();

    let outcome = poll_build_then_deploy(&poller(), &build, &deploy, 1.into(), &hooks)
        .await
        .unwrap();

    assert!(outcome.deploy.is_none());
    assert_eq!(deploy.calls(), 0);
    assert_eq!(hooks.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_never_deploys() {
    let failed = build_with_subs(4, OperationState::Failure, &[("app", OperationState::Failure)]);
    let build = MockFetcher::new(OperationKind::Build, vec![Scripted::Snapshot(failed)]);
    let deploy = MockFetcher::states(OperationKind::Deploy, &[OperationState::Success]);

    let outcome = poll_build_then_deploy(&poller(), &build, &deploy, 4.into(), &RecordingReporter::default())
        .await
        .unwrap();

    assert_eq!(outcome.build.state(), SessionState::PartiallyFailed);
    assert!(outcome.deploy.is_none());
    assert_eq!(deploy.calls(), 0);
    assert_eq!(outcome.exit_status(), ExitStatus::Failure);
}

#[tokio::test(start_paused = true)]
async fn test_build_transport_error_rejects_chain() {
    let build = MockFetcher::new(OperationKind::Build, vec![Scripted::HttpError(500)]);
    let deploy = MockFetcher::states(OperationKind::Deploy, &[OperationState::Success]);
    let hooks = RecordingReporter::default();

    let err = poll_build_then_deploy(&poller(), &build, &deploy, 1.into(), &hooks)
        .await
        .unwrap_err();

    assert_eq!(err.state(), SessionState::Errored);
    assert_eq!(hooks.events(), vec!["start Build 1", "finish Build Errored"]);
}
