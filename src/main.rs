use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reattempt::api::http::HttpSessionApi;
use reattempt::api::types::{ExecutionProcess, RepoBranchStatus};
use reattempt::api::SessionApi;
use reattempt::config::AppConfig;
use reattempt::confirm::terminal::TerminalGate;
use reattempt::confirm::{AutoConfirmGate, ConfirmationGate};
use reattempt::prompt::PromptFragments;
use reattempt::workflow::follow_up::{FollowUpCallbacks, FollowUpDraft, FollowUpWorkflow};
use reattempt::workflow::retry::{RetryParams, RetryWorkflow};
use reattempt::workflow::types::{FollowUpOutcome, RetryOutcome};

#[derive(Parser)]
#[command(name = "reattempt", about = "Send follow-ups and retries to agent sessions")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a follow-up prompt to a session
    FollowUp {
        #[arg(long)]
        session: String,
        /// Free-form message, appended last
        #[arg(short, long)]
        message: Option<String>,
        /// File with review comments
        #[arg(long)]
        review_file: Option<PathBuf>,
        /// File with conflict resolution instructions
        #[arg(long)]
        conflict_file: Option<PathBuf>,
        /// File with clicked element context
        #[arg(long)]
        clicked_file: Option<PathBuf>,
        #[arg(long)]
        variant: Option<String>,
    },
    /// Re-run a session from an earlier execution process
    Retry {
        #[arg(long)]
        session: String,
        /// Execution process to retry from
        #[arg(long)]
        process: String,
        #[arg(short, long)]
        message: String,
        #[arg(long)]
        variant: Option<String>,
        /// JSON file with `processes` and `branch_status` shown before confirming
        #[arg(long)]
        context: Option<PathBuf>,
        /// Confirm without asking
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RetryContextFile {
    #[serde(default)]
    processes: Option<Vec<ExecutionProcess>>,
    #[serde(default)]
    branch_status: Option<Vec<RepoBranchStatus>>,
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    // Logs go to stderr so confirmation prompts on stdout stay readable.
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn read_optional(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map(Some)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(None),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_follow_up(
    api: Arc<dyn SessionApi>,
    config: &AppConfig,
    session: &str,
    message: Option<&str>,
    review_file: Option<&Path>,
    conflict_file: Option<&Path>,
    clicked_file: Option<&Path>,
    variant: Option<&str>,
) -> anyhow::Result<()> {
    let review = read_optional(review_file).await?;
    let conflict = read_optional(conflict_file).await?;
    let clicked = read_optional(clicked_file).await?;

    let callbacks = FollowUpCallbacks::new(
        || tracing::debug!("Review comments consumed"),
        || tracing::debug!("Follow-up editor reset"),
    )
    .with_clear_clicked_elements(|| tracing::debug!("Clicked elements consumed"));

    let workflow = FollowUpWorkflow::new(api, callbacks)
        .reject_concurrent_sends(config.workflow.reject_concurrent_sends);

    let draft = FollowUpDraft {
        session_id: Some(session),
        fragments: PromptFragments {
            conflict: conflict.as_deref(),
            clicked: clicked.as_deref(),
            review: review.as_deref(),
            message,
        },
        variant,
    };

    match workflow.send(&draft).await {
        FollowUpOutcome::Sent => {
            println!("Follow-up started on session {session}");
            Ok(())
        }
        FollowUpOutcome::Skipped(reason) => {
            println!("Nothing sent ({reason:?})");
            Ok(())
        }
        FollowUpOutcome::Failed { error } => anyhow::bail!(error),
    }
}

async fn run_retry(
    api: Arc<dyn SessionApi>,
    config: &AppConfig,
    session: String,
    params: RetryParams,
    yes: bool,
) -> anyhow::Result<()> {
    let gate: Arc<dyn ConfirmationGate> = if yes {
        Arc::new(AutoConfirmGate::new(
            config.retry.default_force_when_dirty,
            config.retry.default_perform_git_reset,
        ))
    } else {
        Arc::new(TerminalGate::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        ))
    };

    let workflow = RetryWorkflow::new(session, api, gate)
        .on_success(|| println!("Retry started"));

    match workflow.retry(&params).await {
        RetryOutcome::Succeeded => Ok(()),
        RetryOutcome::Cancelled => {
            println!("Retry cancelled");
            Ok(())
        }
        RetryOutcome::Skipped => {
            println!("Nothing sent (empty message)");
            Ok(())
        }
        RetryOutcome::Failed { error } => anyhow::bail!("Failed to send retry: {error}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The log format comes from the config, so a load failure is reported
    // through a plain fmt subscriber before bailing out.
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    init_tracing(config.logging.json);

    tracing::debug!(api = ?config.api, "Loaded configuration");

    let api: Arc<dyn SessionApi> = Arc::new(HttpSessionApi::new(&config.api)?);

    match cli.command {
        Command::FollowUp {
            session,
            message,
            review_file,
            conflict_file,
            clicked_file,
            variant,
        } => {
            run_follow_up(
                api,
                &config,
                &session,
                message.as_deref(),
                review_file.as_deref(),
                conflict_file.as_deref(),
                clicked_file.as_deref(),
                variant.as_deref(),
            )
            .await
        }
        Command::Retry {
            session,
            process,
            message,
            variant,
            context,
            yes,
        } => {
            let context = match context {
                Some(path) => {
                    let raw = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<RetryContextFile>(&raw)
                        .with_context(|| format!("Invalid retry context in {}", path.display()))?
                }
                None => RetryContextFile::default(),
            };

            let params = RetryParams {
                message,
                variant,
                execution_process_id: process,
                branch_status: context.branch_status,
                processes: context.processes,
            };

            run_retry(api, &config, session, params, yes).await
        }
    }
}
