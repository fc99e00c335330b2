/// Editor-owned state of a follow-up workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub is_sending: bool,
    pub last_error: Option<String>,
}

/// Why a follow-up was not sent. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No session is bound to the editor yet.
    NoSession,
    /// Every prompt section was empty.
    EmptyPrompt,
    /// Another send is still in flight and concurrent sends are rejected.
    AlreadySending,
}

/// Outcome of a follow-up send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpOutcome {
    Skipped(SkipReason),
    Sent,
    /// Submission failed; `error` is the message now held in `last_error`.
    Failed { error: String },
}

/// Outcome of a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The message was blank; nothing was shown or sent.
    Skipped,
    /// The user declined or dismissed the confirmation.
    Cancelled,
    Succeeded,
    Failed { error: String },
}
