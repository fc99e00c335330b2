pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::CreateFollowUpAttempt;

#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Start a new execution attempt on a session.
    ///
    /// Covers both plain follow-ups and retries of an earlier process; the
    /// request itself says which.
    async fn follow_up(&self, session_id: &str, request: &CreateFollowUpAttempt) -> Result<()>;
}
