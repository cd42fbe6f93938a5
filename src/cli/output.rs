//! CLI output formatting

use crate::api::response::{LogEntry, ValidationCheck, ValidationResults};
use crate::core::{OperationKind, OperationState, StatusSnapshot};
use console::Emoji;
use indicatif::ProgressStyle;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Width of the rule framing build summaries
pub const RULE_WIDTH: usize = 50;

/// Style of the status spinner
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// Fixed-width rule used around summaries
pub fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Format an operation state for display
pub fn format_state(state: OperationState) -> String {
    match state {
        OperationState::Pending => style("PENDING").dim().to_string(),
        OperationState::InProgress => style("IN PROGRESS").yellow().to_string(),
        OperationState::Success => style("SUCCESS").green().to_string(),
        OperationState::Failure => style("FAILURE").red().to_string(),
        OperationState::PartialFailure => style("PARTIAL FAILURE").red().to_string(),
    }
}

fn kind_verb(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Build => "Building",
        OperationKind::Deploy => "Deploying",
        OperationKind::Validation => "Validating",
        OperationKind::FunctionBuild => "Building function package",
    }
}

/// One-line progress message for a snapshot
pub fn format_snapshot_progress(snapshot: &StatusSnapshot) -> String {
    let mut message = format!(
        "{} #{}: {}",
        kind_verb(snapshot.kind),
        snapshot.operation_id,
        format_state(snapshot.state)
    );

    let total = snapshot.sub_operations.len();
    if total > 0 {
        message.push_str(&format!(
            " ({}/{} components finished)",
            snapshot.finished_sub_operations(),
            total
        ));
    }
    message
}

/// Summary printed when a build did not fully succeed
pub fn format_build_failure_summary(build_id: &str, snapshot: &StatusSnapshot) -> String {
    let failed = snapshot.failed_sub_operations();
    let subject = match failed.as_slice() {
        [only] => only.name.clone(),
        _ => format!("{} components", failed.len()),
    };

    let mut lines = vec![
        rule(),
        format!(
            "Build #{} failed because there was a problem\nbuilding {}\n",
            build_id,
            style(subject).bold()
        ),
        "See below for a summary of errors.".to_string(),
        rule(),
    ];

    for sub in &failed {
        lines.push(format!(
            "\n--- {} failed to build with the following error ---",
            style(&sub.name).bold()
        ));
        lines.push(
            style(sub.error_message.as_deref().unwrap_or("No error message provided"))
                .red()
                .to_string(),
        );
    }

    if failed.is_empty() {
        if let Some(message) = &snapshot.error_message {
            lines.push(style(message).red().to_string());
        }
    }

    lines.join("\n")
}

/// Failed components of a deploy, one block each
pub fn format_deploy_failure_summary(snapshot: &StatusSnapshot) -> String {
    let failed = snapshot.failed_sub_operations();
    let mut lines = vec![format!(
        "Deploy #{} failed: {} of {} components did not deploy",
        snapshot.operation_id,
        failed.len(),
        snapshot.sub_operations.len()
    )];
    for sub in failed {
        lines.push(format!(
            "\n--- {} failed to deploy with the following error ---",
            style(&sub.name).bold()
        ));
        lines.push(
            style(sub.error_message.as_deref().unwrap_or("No error message provided"))
                .red()
                .to_string(),
        );
    }
    if let Some(message) = &snapshot.error_message {
        lines.push(style(message).red().to_string());
    }
    lines.join("\n")
}

/// Hint shown after a build that was not deployed automatically
pub fn format_ready_to_deploy(build_id: &str) -> String {
    [
        rule(),
        style(format!("Build #{} succeeded\n", build_id)).bold().to_string(),
        format!("{}Ready to take your project live?", ROCKET),
        format!("Run `{}`", style("hubctl project deploy").yellow()),
        rule(),
    ]
    .join("\n")
}

/// Render one function execution log
pub fn format_log_entry(entry: &LogEntry, compact: bool) -> String {
    let status = entry.status.as_deref().unwrap_or("UNKNOWN");
    let styled_status = if status.eq_ignore_ascii_case("SUCCESS") {
        style(status).green()
    } else {
        style(status).red()
    };
    let duration = entry
        .execution_time
        .map(|ms| format!("{}ms", ms))
        .unwrap_or_else(|| "-".to_string());

    if compact {
        return format!("{} {}", styled_status, style(duration).dim());
    }

    let timestamp = entry
        .created_at()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown time".to_string());

    let mut out = format!(
        "{} {} {}",
        style(timestamp).dim(),
        styled_status,
        style(format!("Execution Time: {}", duration)).dim()
    );
    if let Some(log) = entry.log.as_deref().filter(|l| !l.trim().is_empty()) {
        out.push('\n');
        out.push_str(log.trim_end());
    }
    if let Some(error) = &entry.error {
        out.push_str(&format!(
            "\n{}: {}",
            style(error.error_type.as_deref().unwrap_or("ERROR")).red().bold(),
            error.message.as_deref().unwrap_or("")
        ));
    }
    out
}

fn format_check(check: &ValidationCheck) -> String {
    let icon = if check.passed() { CHECK } else { CROSS };
    let mut line = format!("{}{}", icon, check.message);
    if let Some(file) = &check.file {
        match check.line {
            Some(n) => line.push_str(&format!(" {}", style(format!("({}:{})", file, n)).dim())),
            None => line.push_str(&format!(" {}", style(format!("({})", file)).dim())),
        }
    }
    line
}

/// Render marketplace validation results, required checks first
pub fn format_validation_results(results: &ValidationResults) -> String {
    let mut lines = Vec::new();

    for (title, checks) in [
        ("Required validation results", &results.results.required),
        ("Recommended validation results", &results.results.recommended),
    ] {
        lines.push(style(title).bold().underlined().to_string());
        if checks.is_empty() {
            lines.push(style("No checks reported").dim().to_string());
        }
        lines.extend(checks.iter().map(format_check));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Human-readable elapsed time
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
