//! Build → auto-deploy chaining
//!
//! Two independent polls composed in sequence: the deploy poll starts only
//! when the build poll succeeded and the build snapshot names a deploy task.

use crate::api::StatusFetcher;
use crate::core::{ExitStatus, OperationId, PollOutcome};
use crate::polling::{PollError, Poller, ResultReporter};
use tracing::info;

/// Which poll of the chain is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Deploy,
}

/// Callbacks around each stage of a chain
///
/// The hooks are also the reporter for both polls, so an implementation can
/// route snapshots to whatever display it opened in `stage_started`.
pub trait ChainHooks: ResultReporter {
    fn stage_started(&self, _stage: Stage, _operation_id: &OperationId) {}

    fn stage_finished(&self, _stage: Stage, _result: &Result<PollOutcome, PollError>) {}
}

/// Final outcome of a build and its optional deploy
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub build: PollOutcome,
    pub deploy: Option<PollOutcome>,
}

impl ChainOutcome {
    /// Exit status of the last poll that ran
    pub fn exit_status(&self) -> ExitStatus {
        let build = self.build.exit_status();
        match &self.deploy {
            Some(deploy) => build.and(deploy.exit_status()),
            None => build,
        }
    }
}

/// Deploy task to follow after a build, if the build asked for one
pub fn auto_deploy_target(build: &PollOutcome) -> Option<OperationId> {
    match build {
        PollOutcome::Succeeded(snapshot) => snapshot.auto_deploy_locator(),
        _ => None,
    }
}

/// Poll a build, then its auto-deploy when one was triggered
pub async fn poll_build_then_deploy<B, D, H>(
    poller: &Poller,
    build_fetcher: &B,
    deploy_fetcher: &D,
    build_id: OperationId,
    hooks: &H,
) -> Result<ChainOutcome, PollError>
where
    B: StatusFetcher + ?Sized,
    D: StatusFetcher + ?Sized,
    H: ChainHooks,
{
    hooks.stage_started(Stage::Build, &build_id);
    let build = poller.poll(build_fetcher, build_id, hooks).await;
    hooks.stage_finished(Stage::Build, &build);
    let build = build?;

    let Some(deploy_id) = auto_deploy_target(&build) else {
        return Ok(ChainOutcome { build, deploy: None });
    };

    info!("Build succeeded, following automatic deploy {}", deploy_id);
    hooks.stage_started(Stage::Deploy, &deploy_id);
    let deploy = poller.poll(deploy_fetcher, deploy_id, hooks).await;
    hooks.stage_finished(Stage::Deploy, &deploy);

    Ok(ChainOutcome {
        build,
        deploy: Some(deploy?),
    })
}
