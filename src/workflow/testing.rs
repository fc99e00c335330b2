use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use crate::api::types::CreateFollowUpAttempt;
use crate::api::SessionApi;
use crate::confirm::{ConfirmationGate, ConfirmationResult, RetryContext};
use crate::error::{AppError, Result};

type ErrorFactory = Box<dyn Fn() -> AppError + Send + Sync>;

/// Session API fake that records every submitted request.
pub struct RecordingApi {
    pub requests: Mutex<Vec<(String, CreateFollowUpAttempt)>>,
    fail_with: Option<ErrorFactory>,
}

impl RecordingApi {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    pub fn failing(error: impl Fn() -> AppError + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            fail_with: Some(Box::new(error)),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<(String, CreateFollowUpAttempt)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SessionApi for RecordingApi {
    async fn follow_up(&self, session_id: &str, request: &CreateFollowUpAttempt) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .push((session_id.to_string(), request.clone()));
        match &self.fail_with {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }
}

/// Session API fake that holds each call until the test releases it.
pub struct GatedApi {
    entered: mpsc::UnboundedSender<()>,
    release: Semaphore,
}

impl GatedApi {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (entered, rx) = mpsc::unbounded_channel();
        let api = Arc::new(Self {
            entered,
            release: Semaphore::new(0),
        });
        (api, rx)
    }

    pub fn release(&self, calls: usize) {
        self.release.add_permits(calls);
    }
}

#[async_trait]
impl SessionApi for GatedApi {
    async fn follow_up(&self, _session_id: &str, _request: &CreateFollowUpAttempt) -> Result<()> {
        let _ = self.entered.send(());
        self.release
            .acquire()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .forget();
        Ok(())
    }
}

/// Gate fake that answers with a fixed result and counts how often it is shown.
pub struct ScriptedGate {
    answer: Mutex<Option<Result<ConfirmationResult>>>,
    pub shown_for: Mutex<Vec<String>>,
}

impl ScriptedGate {
    pub fn answering(answer: Result<ConfirmationResult>) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Some(answer)),
            shown_for: Mutex::new(Vec::new()),
        })
    }

    pub fn times_shown(&self) -> usize {
        self.shown_for.lock().unwrap().len()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn show(&self, context: &RetryContext<'_>) -> Result<ConfirmationResult> {
        self.shown_for
            .lock()
            .unwrap()
            .push(context.execution_process_id.to_string());
        self.answer
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(AppError::Gate("gate already answered".to_string())))
    }
}

/// Shared log that callbacks append their names to.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn recorder(&self, name: &'static str) -> Box<dyn Fn() + Send + Sync> {
        let log = Arc::clone(&self.0);
        Box::new(move || log.lock().unwrap().push(name))
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}
