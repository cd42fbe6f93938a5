use anyhow::{Context, Result};
use hubctl::api::response::LogPage;
use hubctl::api::{
    ApiClient, ApiClientConfig, ApiError, BuildStatusFetcher, DeployStatusFetcher,
    FunctionBuildFetcher, LogSource, RouteLogSource, ValidationStatusFetcher,
};
use hubctl::cli::commands::{
    DeployCommand, FunctionsCommand, FunctionsDeployCommand, LogsCommand,
    MarketplaceValidateCommand, PollArgs, ProjectCommand, ThemeCommand, UploadCommand,
};
use hubctl::cli::output::*;
use hubctl::cli::terminal_output::TerminalReporter;
use hubctl::cli::{interrupt, Cli, Command};
use hubctl::core::config::{AccountConfig, CliConfig};
use hubctl::core::{ExitStatus, OperationId, PollOutcome, StatusSnapshot};
use hubctl::polling::{
    poll_build_then_deploy, ChainHooks, PollOptions, Poller, ResultReporter, Stage, TailPoller,
};
use hubctl::project::{
    build_archive, ensure_project_exists, validate_build_id, Project, ProjectError,
};
use serde_json::Value;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

/// Asset type used for theme validations
const THEME_ASSET_TYPE: &str = "THEME";

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{}{:#}", WARN, e);
    }

    let code = match run(cli).await {
        Ok(status) => status.code(),
        Err(e) => {
            eprintln!("{}{}", CROSS, style(format!("{:#}", e)).red());
            ExitStatus::Failure.code()
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")
}

/// Everything a command handler needs
struct CommandContext {
    config: CliConfig,
    account: AccountConfig,
    client: ApiClient,
}

impl CommandContext {
    fn load(cli: &Cli) -> Result<Self> {
        let config = CliConfig::load(cli.config.as_deref(), cli.use_env)
            .context("Failed to load configuration")?;
        let account = config.account(cli.account.as_deref())?.clone();
        let client = ApiClient::new(
            ApiClientConfig::for_account(&account).with_timeout(config.http_timeout_secs),
        )
        .context("Failed to create API client")?;
        debug!("Using account {}", account.description());

        Ok(Self {
            config,
            account,
            client,
        })
    }

    /// Poller honouring config and command flags, cancelled by Ctrl-C
    fn poller(&self, args: &PollArgs) -> Poller {
        let token = CancellationToken::new();
        interrupt::cancel_on_ctrl_c(token.clone());
        Poller::new(args.apply(PollOptions::from(&self.config.polling))).with_cancellation(token)
    }
}

async fn run(cli: Cli) -> Result<ExitStatus> {
    let ctx = CommandContext::load(&cli)?;

    match &cli.command {
        Command::Project(ProjectCommand::Upload(cmd)) => project_upload(&ctx, cmd).await,
        Command::Project(ProjectCommand::Deploy(cmd)) => project_deploy(&ctx, cmd).await,
        Command::Functions(FunctionsCommand::Deploy(cmd)) => functions_deploy(&ctx, cmd).await,
        Command::Functions(FunctionsCommand::Logs(cmd)) => functions_logs(&ctx, cmd).await,
        Command::Theme(ThemeCommand::MarketplaceValidate(cmd)) => theme_validate(&ctx, cmd).await,
    }
}

/// Client errors carry a message meant for the user; anything else keeps its context
fn api_failure(e: ApiError, action: &str) -> anyhow::Error {
    if e.is_client_error() {
        anyhow::anyhow!("{}: {}", action, e.user_message())
    } else {
        anyhow::Error::new(e).context(action.to_string())
    }
}

async fn project_upload(ctx: &CommandContext, cmd: &UploadCommand) -> Result<ExitStatus> {
    let project = Project::find(&cmd.path).context("Failed to load project config")?;
    project.validate()?;
    let name = project.name().to_string();
    let account = ctx.account.description();

    if ensure_project_exists(&ctx.client, &name, cmd.force_create).await? {
        println!("{}Created project {} in {}", INFO, style(&name).bold(), account);
    }

    let archive = build_archive(&project.src_dir()).context("Failed to compress project files")?;

    let reporter = TerminalReporter::new(&name).with_target(account.clone());
    reporter.start(format!("Uploading {} project files to {}", style(&name).bold(), account))?;
    let upload = match ctx.client.upload_project(&name, archive.path()).await {
        Ok(upload) => {
            reporter.succeed(format!("Uploaded {} project files to {}", style(&name).bold(), account));
            upload
        }
        Err(e) => {
            reporter.fail(format!("Failed to upload {} project files to {}", style(&name).bold(), account));
            return Err(api_failure(e, "Upload failed"));
        }
    };
    drop(archive);
    debug!("Project \"{}\" uploaded and build #{} created", name, upload.build_id);

    let poller = ctx.poller(&cmd.poll);
    let outcome = poll_build_then_deploy(
        &poller,
        &BuildStatusFetcher::new(ctx.client.clone(), &name),
        &DeployStatusFetcher::new(ctx.client.clone(), &name),
        OperationId::from(upload.build_id),
        &reporter,
    )
    .await?;

    let build_id = upload.build_id.to_string();
    match (&outcome.build, &outcome.deploy) {
        (PollOutcome::Failed(snapshot) | PollOutcome::PartiallyFailed(snapshot), _) => {
            println!("{}", format_build_failure_summary(&build_id, snapshot));
        }
        (PollOutcome::Succeeded(_), None) => println!("{}", format_ready_to_deploy(&build_id)),
        (PollOutcome::Cancelled { .. }, _) => {
            println!("{}Stopped waiting for build #{}", INFO, build_id)
        }
        (_, Some(deploy)) => print_deploy_result(deploy),
    }

    Ok(outcome.exit_status())
}

fn print_deploy_result(outcome: &PollOutcome) {
    match outcome {
        PollOutcome::Failed(snapshot) | PollOutcome::PartiallyFailed(snapshot) => {
            println!("{}", format_deploy_failure_summary(snapshot))
        }
        PollOutcome::Cancelled { last_snapshot } => {
            let id = last_snapshot
                .as_ref()
                .map(|s| s.operation_id.to_string())
                .unwrap_or_default();
            println!("{}Stopped waiting for deploy {}", INFO, id)
        }
        PollOutcome::Succeeded(_) => {}
    }
}

async fn project_deploy(ctx: &CommandContext, cmd: &DeployCommand) -> Result<ExitStatus> {
    let name = match &cmd.project {
        Some(name) => name.clone(),
        None => {
            Project::find(Path::new("."))
                .context("No --project given and no project found in the current directory")?
                .config
                .name
        }
    };
    let account = ctx.account.description();

    let details = match ctx.client.fetch_project(&name).await {
        Ok(details) => details,
        Err(e) if e.is_not_found() => anyhow::bail!(
            "The project {} does not exist in account {}. Run `hubctl project upload` to upload your project files",
            style(&name).bold(),
            account
        ),
        Err(e) => return Err(api_failure(e, "Failed to fetch project")),
    };

    let latest = details
        .latest_build
        .map(|b| b.build_id)
        .ok_or_else(|| ProjectError::NoBuilds(name.clone()))?;
    let build_id = cmd.build.unwrap_or(latest);
    validate_build_id(&name, build_id, details.deployed_build_id, latest)?;

    let response = ctx
        .client
        .deploy_project(&name, build_id)
        .await
        .map_err(|e| api_failure(e, "Deploy failed"))?;
    if let Some(error) = response.error {
        anyhow::bail!("Deploy failed: {}", error.message);
    }
    let deploy_id = response
        .id
        .as_ref()
        .and_then(OperationId::from_json)
        .context("Deploy response did not include a deploy id")?;

    println!(
        "{}Deploying build #{} of {} to {}",
        ROCKET,
        build_id,
        style(&name).bold(),
        account
    );

    let reporter = TerminalReporter::new(&name);
    let fetcher = DeployStatusFetcher::new(ctx.client.clone(), &name);
    reporter.stage_started(Stage::Deploy, &deploy_id);
    let result = ctx.poller(&cmd.poll).poll(&fetcher, deploy_id, &reporter).await;
    reporter.stage_finished(Stage::Deploy, &result);

    let outcome = result?;
    print_deploy_result(&outcome);
    Ok(outcome.exit_status())
}

async fn print_build_log(client: &ApiClient, snapshot: &StatusSnapshot) {
    let Some(url) = snapshot.raw.get("cdnUrl").and_then(Value::as_str) else {
        return;
    };
    match client.fetch_build_log(url).await {
        Ok(log) if !log.trim().is_empty() => println!("{}", log.trim_end()),
        Ok(_) => {}
        Err(e) => warn!("Could not fetch build log: {}", e),
    }
}

async fn functions_deploy(ctx: &CommandContext, cmd: &FunctionsDeployCommand) -> Result<ExitStatus> {
    let account = ctx.account.description();
    debug!("Starting build and deploy for {}", cmd.path);

    let reporter = TerminalReporter::new(&cmd.path);
    reporter.start(format!(
        "Building and deploying bundle for {} on account {}",
        style(&cmd.path).bold(),
        account
    ))?;

    let response = match ctx.client.build_function_package(&cmd.path).await {
        Ok(response) => response,
        Err(e) => {
            reporter.clear();
            if e.is_not_found() {
                anyhow::bail!("Unable to find package.json for function {}", cmd.path);
            }
            return Err(api_failure(e, "Function build failed"));
        }
    };
    let build_id = OperationId::from_json(&response.build_id)
        .context("Build response did not include a build id")?;

    let result = ctx
        .poller(&cmd.poll)
        .poll(&FunctionBuildFetcher::new(ctx.client.clone()), build_id, &reporter)
        .await;
    reporter.clear();

    let outcome = result?;
    match &outcome {
        PollOutcome::Succeeded(snapshot) => {
            print_build_log(&ctx.client, snapshot).await;
            let seconds = snapshot
                .raw
                .get("buildTime")
                .and_then(Value::as_f64)
                .map(|ms| ms / 1000.0)
                .unwrap_or_default();
            println!(
                "{}Built and deployed bundle from package.json for {} on account {} in {:.2}s",
                CHECK, cmd.path, account, seconds
            );
        }
        PollOutcome::Failed(snapshot) | PollOutcome::PartiallyFailed(snapshot) => {
            print_build_log(&ctx.client, snapshot).await;
            eprintln!(
                "{}Failed to build and deploy bundle: {}",
                CROSS,
                snapshot.error_message.as_deref().unwrap_or("unknown reason")
            );
        }
        PollOutcome::Cancelled { .. } => println!("{}Stopped waiting for {}", INFO, cmd.path),
    }
    Ok(outcome.exit_status())
}

async fn functions_logs(ctx: &CommandContext, cmd: &LogsCommand) -> Result<ExitStatus> {
    let source = RouteLogSource::new(ctx.client.clone(), &cmd.route).with_limit(cmd.limit);
    let reporter = TerminalReporter::new(&cmd.route).with_compact_logs(cmd.compact);

    if cmd.follow {
        let token = CancellationToken::new();
        let _keys = interrupt::cancel_on_keypress(token.clone());
        println!(
            "{}Following logs for {}. Press {} to stop",
            INFO,
            style(&cmd.route).bold(),
            style("q").bold()
        );

        let summary = TailPoller::new(ctx.config.polling.tail_interval())
            .with_cancellation(token)
            .tail(&source, &reporter)
            .await
            .map_err(|e| api_failure(e, "Failed to fetch logs"))?;
        debug!("Tail finished: {:?}", summary);
        return Ok(ExitStatus::Success);
    }

    let page = if cmd.latest {
        match source.fetch_latest().await {
            Ok(entry) => LogPage {
                results: entry.into_iter().collect(),
                paging: None,
            },
            Err(e) => return Err(api_failure(e, "Failed to fetch logs")),
        }
    } else {
        match source.fetch_page(None).await {
            Ok(page) => page,
            Err(e) if e.is_not_found() => LogPage::empty(),
            Err(e) => return Err(api_failure(e, "Failed to fetch logs")),
        }
    };

    if page.is_empty() {
        println!("{}No logs found for {}", INFO, style(&cmd.route).bold());
    } else {
        reporter.on_log_page(&page);
    }
    Ok(ExitStatus::Success)
}

async fn theme_validate(ctx: &CommandContext, cmd: &MarketplaceValidateCommand) -> Result<ExitStatus> {
    let reporter = TerminalReporter::new(&cmd.src);
    reporter.start(format!("Validating theme {}", style(&cmd.src).bold()))?;

    let validation_id = match ctx.client.start_validation(THEME_ASSET_TYPE, &cmd.src).await {
        Ok(id) => id,
        Err(e) => {
            reporter.clear();
            return Err(api_failure(e, "Failed to start validation"));
        }
    };

    let result = ctx
        .poller(&cmd.poll)
        .poll(
            &ValidationStatusFetcher::new(ctx.client.clone()),
            validation_id.clone(),
            &reporter,
        )
        .await;
    reporter.clear();

    let outcome = result?;
    if let PollOutcome::Cancelled { .. } = outcome {
        println!("{}Stopped waiting for validation {}", INFO, validation_id);
        return Ok(ExitStatus::Success);
    }

    let results = ctx
        .client
        .fetch_validation_results(&validation_id)
        .await
        .map_err(|e| api_failure(e, "Failed to fetch validation results"))?;

    if !results.errors.is_empty() {
        for error in &results.errors {
            eprintln!("{}{}", CROSS, style(&error.message).red());
        }
        return Ok(ExitStatus::Failure);
    }

    println!("{}", format_validation_results(&results));
    let failed = results.failed_required();
    if failed > 0 || outcome.is_failure() {
        println!("{}{} required checks failed", CROSS, failed);
        Ok(ExitStatus::Failure)
    } else {
        println!("{}All required checks passed", CHECK);
        Ok(ExitStatus::Success)
    }
}
