use std::sync::Arc;

use crate::api::types::{CreateFollowUpAttempt, ExecutionProcess, RepoBranchStatus, RetryOptions};
use crate::api::SessionApi;
use crate::confirm::{ConfirmationGate, RetryContext, RetryDecision};
use crate::error::AppError;
use crate::workflow::types::RetryOutcome;
use crate::workflow::Callback;

pub type ErrorCallback = Box<dyn Fn(&AppError) + Send + Sync>;

/// A request to re-run a session from an earlier execution process.
#[derive(Debug, Clone)]
pub struct RetryParams {
    /// Final prompt, already composed by the caller.
    pub message: String,
    pub variant: Option<String>,
    pub execution_process_id: String,
    pub branch_status: Option<Vec<RepoBranchStatus>>,
    pub processes: Option<Vec<ExecutionProcess>>,
}

impl RetryParams {
    fn context(&self) -> RetryContext<'_> {
        RetryContext {
            execution_process_id: &self.execution_process_id,
            branch_status: self.branch_status.as_deref(),
            processes: self.processes.as_deref(),
        }
    }
}

pub fn build_retry_request(params: &RetryParams, options: RetryOptions) -> CreateFollowUpAttempt {
    CreateFollowUpAttempt::retry(
        params.message.clone(),
        params.variant.clone(),
        params.execution_process_id.clone(),
        options,
    )
}

/// Confirms and submits retries of earlier processes in one session.
///
/// Each call runs its own confirm/submit cycle; overlapping calls are not
/// coalesced.
pub struct RetryWorkflow {
    session_id: String,
    api: Arc<dyn SessionApi>,
    gate: Arc<dyn ConfirmationGate>,
    on_success: Option<Callback>,
    on_error: Option<ErrorCallback>,
}

impl RetryWorkflow {
    pub fn new(
        session_id: impl Into<String>,
        api: Arc<dyn SessionApi>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            api,
            gate,
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called with submission failures only, never for a cancelled dialog.
    pub fn on_error(mut self, f: impl Fn(&AppError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    async fn confirm(&self, params: &RetryParams) -> RetryDecision {
        match self.gate.show(&params.context()).await {
            Ok(result) => result.into_decision(),
            Err(e) => {
                tracing::debug!(error = %e, "Retry confirmation closed without an answer");
                RetryDecision::Cancelled
            }
        }
    }

    pub async fn retry(&self, params: &RetryParams) -> RetryOutcome {
        if params.message.trim().is_empty() {
            tracing::debug!(
                process = %params.execution_process_id,
                "Retry message is empty, nothing to send"
            );
            return RetryOutcome::Skipped;
        }

        let options = match self.confirm(params).await {
            RetryDecision::Confirmed(options) => options,
            RetryDecision::Cancelled => {
                tracing::info!(process = %params.execution_process_id, "Retry cancelled");
                return RetryOutcome::Cancelled;
            }
        };

        let request = build_retry_request(params, options);

        tracing::info!(
            session_id = %self.session_id,
            process = %params.execution_process_id,
            force_when_dirty = options.force_when_dirty,
            perform_git_reset = options.perform_git_reset,
            "Sending retry"
        );

        match self.api.follow_up(&self.session_id, &request).await {
            Ok(()) => {
                if let Some(ref on_success) = self.on_success {
                    on_success();
                }
                RetryOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(
                    session_id = %self.session_id,
                    process = %params.execution_process_id,
                    error = %e,
                    "Failed to send retry"
                );
                if let Some(ref on_error) = self.on_error {
                    on_error(&e);
                }
                RetryOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
