//! Pull command - Apply remote changes to the local mirror
//!
//! Wires the HTTP transport, the snapshot resolver, the confirmation gate
//! and the batch applier together, then prints a summary of the run.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use drivesync_core::config::{Config, ConfigBuilder};
use drivesync_core::ports::{AutoConfirm, IConfirmation, IProgressReporter, IRemoteTransport};
use drivesync_remote::transport::HttpTransport;
use drivesync_remote::RemoteError;
use drivesync_sync::applier::{ApplyOptions, ApplyReport, BatchApplier};
use drivesync_sync::progress::CountingProgress;
use drivesync_sync::pull::{PullOrchestrator, PullOutcome};
use drivesync_sync::resolver::SnapshotResolver;
use drivesync_sync::PullError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::prompt::PromptConfirmation;
use super::{exit_code, RunContext};
use crate::output::plural;

/// Exit status used when a second interrupt aborts the process
const INTERRUPTED_EXIT: i32 = 130;

/// Pull command arguments
#[derive(Debug, Args)]
pub struct PullCommand {
    /// Drive path to pull, relative to the drive root (default: everything)
    #[arg(default_value = "")]
    pub path: String,

    /// Apply without asking for confirmation
    #[arg(long)]
    pub no_prompt: bool,

    /// Changes applied concurrently per batch
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Stop after the first batch that reports a failure
    #[arg(long)]
    pub fail_fast: bool,
}

impl PullCommand {
    /// Execute the pull command
    pub async fn execute(&self, ctx: &RunContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();

        let config = match self
            .with_overrides(Config::load_or_default(&ctx.config_path))
            .build_validated()
        {
            Ok(config) => config,
            Err(errors) => {
                for error in &errors {
                    formatter.error(&error.to_string());
                }
                return Ok(ExitCode::FAILURE);
            }
        };

        let root = config.pull.root.clone();
        info!(path = %self.path, root = %root.display(), "Starting pull");

        let transport: Arc<dyn IRemoteTransport> = Arc::new(
            HttpTransport::from_config(&config.remote).context("Failed to create drive client")?,
        );
        let progress = Arc::new(ConsoleProgress::new(!ctx.quiet && !ctx.is_json()));
        let confirmation: Arc<dyn IConfirmation> = if config.pull.no_prompt {
            Arc::new(AutoConfirm)
        } else {
            Arc::new(PromptConfirmation)
        };

        let token = CancellationToken::new();
        let applier = BatchApplier::new(
            &root,
            Arc::clone(&transport),
            progress,
            ApplyOptions::from(&config.pull),
        )
        .with_cancellation(token.clone());
        let resolver = Arc::new(SnapshotResolver::new(&root, Arc::clone(&transport)));
        let orchestrator = PullOrchestrator::new(&root, transport, resolver, confirmation, applier);

        let signals = tokio::spawn(cancel_on_interrupt(token));
        let result = orchestrator.pull(&self.path).await;
        signals.abort();

        match result {
            Ok(outcome) => {
                if ctx.is_json() {
                    formatter.print_json(&summary_json(&self.path, &outcome));
                } else {
                    print_summary(ctx, &outcome);
                }
                Ok(exit_code(!matches!(
                    &outcome,
                    PullOutcome::Applied(report) if !report.is_success()
                )))
            }
            Err(err) => {
                formatter.error(&format!("{err}"));
                if is_unauthorized(&err) {
                    formatter.info(
                        "The drive rejected the access token. Set one with 'drivesync config set remote.access_token <token>'.",
                    );
                }
                Ok(ExitCode::FAILURE)
            }
        }
    }

    /// Command-line flags take precedence over the config file
    fn with_overrides(&self, config: Config) -> ConfigBuilder {
        let mut builder = ConfigBuilder::from(config);
        if self.no_prompt {
            builder = builder.pull_no_prompt(true);
        }
        if self.fail_fast {
            builder = builder.pull_fail_fast(true);
        }
        if let Some(max) = self.max_concurrent {
            builder = builder.pull_max_concurrent(max);
        }
        builder
    }
}

/// First interrupt cancels the run, a second one exits immediately
async fn cancel_on_interrupt(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    warn!("Interrupted; finishing in-flight changes (press Ctrl+C again to abort)");
    token.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(INTERRUPTED_EXIT);
    }
}

fn is_unauthorized(err: &PullError) -> bool {
    let source = match err {
        PullError::Resolution(e) | PullError::Confirmation(e) => e,
        PullError::DuplicatePath(_) => return false,
    };
    source.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<RemoteError>(),
            Some(RemoteError::Unauthorized(_))
        )
    })
}

fn print_summary(ctx: &RunContext, outcome: &PullOutcome) {
    let formatter = ctx.formatter();
    match outcome {
        PullOutcome::UpToDate => formatter.success("Everything is up to date"),
        PullOutcome::Declined { pending } => {
            formatter.warn(&format!(
                "Pull cancelled, {} not applied",
                plural(pending.len(), "change")
            ));
        }
        PullOutcome::Applied(report) => {
            let duration = duration_display(report.duration_ms);
            if report.is_success() {
                formatter.success(&format!(
                    "Applied {} in {duration}",
                    plural(report.succeeded(), "change")
                ));
            } else {
                formatter.error(&format!(
                    "Applied {} of {} in {duration}",
                    report.succeeded(),
                    plural(report.total(), "change")
                ));
            }
            formatter.info(&format!("Batches:  {}", report.batches));
            if report.failed() > 0 {
                formatter.info(&format!("Failed:   {}", report.failed()));
            }
            if report.skipped() > 0 {
                formatter.info(&format!("Skipped:  {}", report.skipped()));
            }
            for (change, err) in report.failures() {
                formatter.warn(&format!("{change}: {err}"));
            }
        }
    }
}

fn summary_json(path: &str, outcome: &PullOutcome) -> serde_json::Value {
    match outcome {
        PullOutcome::UpToDate => serde_json::json!({
            "success": true,
            "path": path,
            "status": "up_to_date",
        }),
        PullOutcome::Declined { pending } => serde_json::json!({
            "success": true,
            "path": path,
            "status": "declined",
            "pending": pending.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        }),
        PullOutcome::Applied(report) => report_json(path, report),
    }
}

fn report_json(path: &str, report: &ApplyReport) -> serde_json::Value {
    let failures: Vec<_> = report
        .failures()
        .map(|(change, err)| {
            serde_json::json!({
                "path": change.path().as_str(),
                "op": change.op(),
                "error": err.to_string(),
            })
        })
        .collect();

    serde_json::json!({
        "success": report.is_success(),
        "path": path,
        "status": "applied",
        "total": report.total(),
        "succeeded": report.succeeded(),
        "failed": report.failed(),
        "skipped": report.skipped(),
        "batches": report.batches,
        "duration_ms": report.duration_ms,
        "failures": failures,
    })
}

fn duration_display(ms: u64) -> String {
    let duration = Duration::from_millis(ms);
    if duration.as_secs() >= 60 {
        format!("{}m {}s", duration.as_secs() / 60, duration.as_secs() % 60)
    } else if ms >= 1000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{ms}ms")
    }
}

// ============================================================================
// ConsoleProgress
// ============================================================================

/// Counts tasks and echoes progress to stderr
struct ConsoleProgress {
    counter: CountingProgress,
    echo: bool,
}

impl ConsoleProgress {
    fn new(echo: bool) -> Self {
        Self {
            counter: CountingProgress::new(),
            echo,
        }
    }
}

impl IProgressReporter for ConsoleProgress {
    fn on_start(&self, total: usize) {
        self.counter.on_start(total);
        if self.echo {
            eprint!("{}", render_start(total));
        }
    }

    fn on_task_done(&self) {
        self.counter.on_task_done();
        if self.echo {
            eprint!("\r  [{}/{}]", self.counter.done(), self.counter.total());
        }
    }

    fn on_finish(&self) {
        self.counter.on_finish();
        if self.echo {
            eprintln!();
        }
    }

    fn on_notice(&self, message: &str) {
        self.counter.on_notice(message);
        if self.echo {
            eprintln!("\r  {message}");
        }
    }
}

fn render_start(total: usize) -> String {
    format!("Applying {}\n", plural(total, "change"))
}
