use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a follow-up attempt, shared by plain follow-ups and retries.
///
/// The retry-only options are set if and only if `retry_process_id` is set;
/// the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateFollowUpAttempt {
    pub prompt: String,
    pub variant: Option<String>,
    retry_process_id: Option<String>,
    force_when_dirty: Option<bool>,
    perform_git_reset: Option<bool>,
    working_dir: Option<String>,
    env: Option<HashMap<String, String>>,
}

/// Destructive options of a confirmed retry, already defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    pub force_when_dirty: bool,
    pub perform_git_reset: bool,
}

impl CreateFollowUpAttempt {
    pub fn follow_up(prompt: impl Into<String>, variant: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            variant,
            retry_process_id: None,
            force_when_dirty: None,
            perform_git_reset: None,
            working_dir: None,
            env: None,
        }
    }

    pub fn retry(
        prompt: impl Into<String>,
        variant: Option<String>,
        process_id: impl Into<String>,
        options: RetryOptions,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            variant,
            retry_process_id: Some(process_id.into()),
            force_when_dirty: Some(options.force_when_dirty),
            perform_git_reset: Some(options.perform_git_reset),
            working_dir: None,
            env: None,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retry_process_id.is_some()
    }

    pub fn retry_process_id(&self) -> Option<&str> {
        self.retry_process_id.as_deref()
    }

    pub fn force_when_dirty(&self) -> Option<bool> {
        self.force_when_dirty
    }

    pub fn perform_git_reset(&self) -> Option<bool> {
        self.perform_git_reset
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    pub fn env(&self) -> Option<&HashMap<String, String>> {
        self.env.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunReason {
    SetupScript,
    CleanupScript,
    CodingAgent,
    DevServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Completed,
    Failed,
    Killed,
}

/// A process that ran inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProcess {
    pub id: String,
    pub session_id: String,
    pub run_reason: RunReason,
    pub status: ProcessStatus,
    /// Already discarded by an earlier retry.
    #[serde(default)]
    pub dropped: bool,
    pub created_at: DateTime<Utc>,
}

/// Branch state of one repository attached to the session workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoBranchStatus {
    pub repo_id: String,
    pub repo_name: String,
    #[serde(default)]
    pub has_uncommitted_changes: bool,
    #[serde(default)]
    pub uncommitted_count: u32,
    #[serde(default)]
    pub commits_ahead: u32,
    #[serde(default)]
    pub commits_behind: u32,
}

/// Envelope the session backend wraps every response in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_follow_up_leaves_retry_fields_null() {
        let req = CreateFollowUpAttempt::follow_up("do it", Some("PLAN".to_string()));
        assert!(!req.is_retry());
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "prompt": "do it",
                "variant": "PLAN",
                "retry_process_id": null,
                "force_when_dirty": null,
                "perform_git_reset": null,
                "working_dir": null,
                "env": null
            })
        );
    }

    #[test]
    fn test_retry_sets_both_options() {
        let req = CreateFollowUpAttempt::retry(
            "again",
            None,
            "proc-1",
            RetryOptions {
                force_when_dirty: true,
                perform_git_reset: false,
            },
        );
        assert!(req.is_retry());
        assert_eq!(req.retry_process_id(), Some("proc-1"));
        assert_eq!(req.force_when_dirty(), Some(true));
        assert_eq!(req.perform_git_reset(), Some(false));
        assert_eq!(req.working_dir(), None);
        assert!(req.env().is_none());
    }

    #[test]
    fn test_process_deserializes_without_dropped_flag() {
        let process: ExecutionProcess = serde_json::from_value(json!({
            "id": "p1",
            "session_id": "s1",
            "run_reason": "coding_agent",
            "status": "completed",
            "created_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(process.run_reason, RunReason::CodingAgent);
        assert_eq!(process.status, ProcessStatus::Completed);
        assert!(!process.dropped);
    }

    #[test]
    fn test_error_envelope() {
        let resp: ApiResponse<serde_json::Value> =
            serde_json::from_str(r#"{"success":false,"message":"session is busy"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.message.as_deref(), Some("session is busy"));
    }
}
