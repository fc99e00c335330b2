pub mod terminal;

use async_trait::async_trait;

use crate::api::types::{ExecutionProcess, RepoBranchStatus, RetryOptions};
use crate::error::Result;

/// What the confirmation gate is shown before a retry.
///
/// The gate may use the process list and branch status for display; the
/// workflow passes them through without looking at them.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    pub execution_process_id: &'a str,
    pub branch_status: Option<&'a [RepoBranchStatus]>,
    pub processes: Option<&'a [ExecutionProcess]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Confirmed,
    Dismissed,
    Cancelled,
    Other(String),
}

/// Raw answer from a confirmation gate. Unset options fall back to their
/// defaults in [`ConfirmationResult::into_decision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationResult {
    pub action: ConfirmAction,
    pub force_when_dirty: Option<bool>,
    pub perform_git_reset: Option<bool>,
}

/// Whether a retry may go ahead, and with which options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Confirmed(RetryOptions),
    Cancelled,
}

impl ConfirmationResult {
    pub fn confirmed() -> Self {
        Self {
            action: ConfirmAction::Confirmed,
            force_when_dirty: None,
            perform_git_reset: None,
        }
    }

    pub fn dismissed() -> Self {
        Self {
            action: ConfirmAction::Dismissed,
            force_when_dirty: None,
            perform_git_reset: None,
        }
    }

    pub fn into_decision(self) -> RetryDecision {
        match self.action {
            ConfirmAction::Confirmed => RetryDecision::Confirmed(RetryOptions {
                force_when_dirty: self.force_when_dirty.unwrap_or(false),
                perform_git_reset: self.perform_git_reset.unwrap_or(true),
            }),
            _ => RetryDecision::Cancelled,
        }
    }
}

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Ask the user whether to retry. An `Err` means the gate was torn down
    /// without an answer and is handled as a cancellation.
    async fn show(&self, context: &RetryContext<'_>) -> Result<ConfirmationResult>;
}

/// Gate that confirms every retry without asking.
pub struct AutoConfirmGate {
    force_when_dirty: Option<bool>,
    perform_git_reset: Option<bool>,
}

impl AutoConfirmGate {
    pub fn new(force_when_dirty: Option<bool>, perform_git_reset: Option<bool>) -> Self {
        Self {
            force_when_dirty,
            perform_git_reset,
        }
    }
}

#[async_trait]
impl ConfirmationGate for AutoConfirmGate {
    async fn show(&self, context: &RetryContext<'_>) -> Result<ConfirmationResult> {
        tracing::info!(
            process = %context.execution_process_id,
            "Retry confirmed without prompting"
        );
        Ok(ConfirmationResult {
            action: ConfirmAction::Confirmed,
            force_when_dirty: self.force_when_dirty,
            perform_git_reset: self.perform_git_reset,
        })
    }
}
