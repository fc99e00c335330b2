use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::types::CreateFollowUpAttempt;
use crate::api::SessionApi;
use crate::prompt::PromptFragments;
use crate::workflow::types::{FollowUpOutcome, SkipReason, WorkflowState};
use crate::workflow::Callback;

const FAILURE_PREFIX: &str = "Failed to start follow-up execution";
const UNKNOWN_ERROR: &str = "Unknown error";

/// Hooks run, in field order, after a follow-up was accepted.
pub struct FollowUpCallbacks {
    pub clear_comments: Callback,
    pub clear_clicked_elements: Option<Callback>,
    pub on_after_send_cleanup: Callback,
}

impl FollowUpCallbacks {
    pub fn new(
        clear_comments: impl Fn() + Send + Sync + 'static,
        on_after_send_cleanup: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            clear_comments: Box::new(clear_comments),
            clear_clicked_elements: None,
            on_after_send_cleanup: Box::new(on_after_send_cleanup),
        }
    }

    pub fn with_clear_clicked_elements(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.clear_clicked_elements = Some(Box::new(f));
        self
    }

    fn run(&self) {
        (self.clear_comments)();
        if let Some(ref clear_clicked) = self.clear_clicked_elements {
            clear_clicked();
        }
        (self.on_after_send_cleanup)();
    }
}

/// Everything the editor holds at the moment the user hits send.
#[derive(Debug, Clone, Default)]
pub struct FollowUpDraft<'a> {
    pub session_id: Option<&'a str>,
    pub fragments: PromptFragments<'a>,
    pub variant: Option<&'a str>,
}

/// Sends follow-up prompts for one session editor.
pub struct FollowUpWorkflow {
    api: Arc<dyn SessionApi>,
    callbacks: FollowUpCallbacks,
    state: Mutex<WorkflowState>,
    reject_concurrent_sends: bool,
}

/// Clears `is_sending` when dropped, so a panicking callback or an abandoned
/// send cannot leave the editor stuck.
struct SendingGuard<'a> {
    state: &'a Mutex<WorkflowState>,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_sending = false;
    }
}

impl FollowUpWorkflow {
    pub fn new(api: Arc<dyn SessionApi>, callbacks: FollowUpCallbacks) -> Self {
        Self {
            api,
            callbacks,
            state: Mutex::new(WorkflowState::default()),
            reject_concurrent_sends: false,
        }
    }

    /// Skip sends issued while an earlier one is still in flight.
    pub fn reject_concurrent_sends(mut self, reject: bool) -> Self {
        self.reject_concurrent_sends = reject;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> WorkflowState {
        self.lock_state().clone()
    }

    pub fn is_sending(&self) -> bool {
        self.lock_state().is_sending
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    pub fn set_last_error(&self, error: Option<String>) {
        self.lock_state().last_error = error;
    }

    pub async fn send(&self, draft: &FollowUpDraft<'_>) -> FollowUpOutcome {
        let Some(session_id) = draft.session_id.filter(|s| !s.is_empty()) else {
            return FollowUpOutcome::Skipped(SkipReason::NoSession);
        };

        let prompt = draft.fragments.compose();
        if prompt.is_empty() {
            return FollowUpOutcome::Skipped(SkipReason::EmptyPrompt);
        }

        let _sending = {
            let mut state = self.lock_state();
            if self.reject_concurrent_sends && state.is_sending {
                tracing::debug!(
                    session_id = %session_id,
                    "Follow-up already in flight, skipping"
                );
                return FollowUpOutcome::Skipped(SkipReason::AlreadySending);
            }
            state.last_error = None;
            state.is_sending = true;
            SendingGuard { state: &self.state }
        };

        let request = CreateFollowUpAttempt::follow_up(prompt, draft.variant.map(str::to_string));

        tracing::info!(
            session_id = %session_id,
            variant = ?request.variant,
            prompt_len = request.prompt.len(),
            "Sending follow-up"
        );

        match self.api.follow_up(session_id, &request).await {
            Ok(()) => {
                // Focus stays on the editor; no jump to the logs view.
                self.callbacks.run();
                FollowUpOutcome::Sent
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    error = %e,
                    "Follow-up submission failed"
                );
                let message = format!(
                    "{FAILURE_PREFIX}: {}",
                    e.user_message().as_deref().unwrap_or(UNKNOWN_ERROR)
                );
                self.lock_state().last_error = Some(message.clone());
                FollowUpOutcome::Failed { error: message }
            }
        }
    }
}
