use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::api::types::{ExecutionProcess, RepoBranchStatus};
use crate::confirm::{ConfirmAction, ConfirmationGate, ConfirmationResult, RetryContext};
use crate::error::{AppError, Result};

/// Confirmation gate that asks on a line-oriented terminal.
pub struct TerminalGate<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> TerminalGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

/// Processes after the retried one that the retry will discard.
fn later_processes<'a>(
    processes: &'a [ExecutionProcess],
    execution_process_id: &str,
) -> Vec<&'a ExecutionProcess> {
    match processes.iter().position(|p| p.id == execution_process_id) {
        Some(index) => processes[index + 1..].iter().filter(|p| !p.dropped).collect(),
        None => Vec::new(),
    }
}

fn dirty_repos(branch_status: &[RepoBranchStatus]) -> Vec<&RepoBranchStatus> {
    branch_status
        .iter()
        .filter(|r| r.has_uncommitted_changes)
        .collect()
}

fn summary(context: &RetryContext<'_>) -> String {
    let mut lines = vec![format!(
        "Retry from process {}.",
        context.execution_process_id
    )];

    if let Some(processes) = context.processes {
        let later = later_processes(processes, context.execution_process_id);
        if !later.is_empty() {
            lines.push(format!(
                "{} later process(es) and their logs will be discarded.",
                later.len()
            ));
        }
    }

    if let Some(branch_status) = context.branch_status {
        for repo in dirty_repos(branch_status) {
            lines.push(format!(
                "{} has {} uncommitted change(s).",
                repo.repo_name, repo.uncommitted_count
            ));
        }
    }

    lines.join("\n")
}

async fn ask<R, W>(reader: &mut R, writer: &mut W, question: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    writer.write_all(question.as_bytes()).await?;
    writer.flush().await?;

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(AppError::Gate("input closed before an answer".to_string()));
    }
    Ok(line.trim().to_lowercase())
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl<R, W> ConfirmationGate for TerminalGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn show(&self, context: &RetryContext<'_>) -> Result<ConfirmationResult> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writer.write_all(summary(context).as_bytes()).await?;
        writer.write_all(b"\n").await?;

        let answer = ask(reader, writer, "Retry this process? [y/N] ").await?;
        if parse_yes_no(&answer) != Some(true) {
            return Ok(ConfirmationResult::dismissed());
        }

        let perform_git_reset = parse_yes_no(
            &ask(
                reader,
                writer,
                "Reset the worktree to where this process started? [Y/n] ",
            )
            .await?,
        );

        let is_dirty = context
            .branch_status
            .is_some_and(|status| !dirty_repos(status).is_empty());

        let force_when_dirty = if is_dirty && perform_git_reset != Some(false) {
            parse_yes_no(&ask(reader, writer, "Discard uncommitted changes? [y/N] ").await?)
        } else {
            None
        };

        Ok(ConfirmationResult {
            action: ConfirmAction::Confirmed,
            force_when_dirty,
            perform_git_reset,
        })
    }
}
