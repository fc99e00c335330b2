use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::api::types::{ApiResponse, CreateFollowUpAttempt};
use crate::api::SessionApi;
use crate::config::ApiConfig;
use crate::error::{AppError, Result};

/// `SessionApi` backed by the session server's REST API.
pub struct HttpSessionApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSessionApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn follow_up_url(&self, session_id: &str) -> String {
        format!(
            "{}/api/sessions/{}/follow-up",
            self.base_url,
            urlencoding::encode(session_id)
        )
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn follow_up(&self, session_id: &str, request: &CreateFollowUpAttempt) -> Result<()> {
        let url = self.follow_up_url(session_id);

        tracing::debug!(
            session_id = %session_id,
            retry = request.is_retry(),
            "Posting follow-up attempt"
        );

        let mut builder = self.client.post(&url).json(request);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Error bodies are not always JSON (proxies, panics), so only the
        // message is salvaged when it parses.
        let envelope = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body);

        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                message: envelope.ok().and_then(|e| e.message),
            });
        }

        // Some deployments answer an accepted attempt with an empty 2xx.
        if body.trim().is_empty() {
            return Ok(());
        }

        let envelope = envelope?;
        if !envelope.success {
            return Err(AppError::Api {
                status: status.as_u16(),
                message: envelope.message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::RetryOptions;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer, token: Option<&str>) -> HttpSessionApi {
        HttpSessionApi::new(&ApiConfig {
            base_url: format!("{}/", server.uri()),
            token: token.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_retry_body_to_session_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions/sess-1/follow-up"))
            .and(header("authorization", "Bearer abc"))
            .and(body_json(json!({
                "prompt": "try again",
                "variant": null,
                "retry_process_id": "proc-9",
                "force_when_dirty": false,
                "perform_git_reset": true,
                "working_dir": null,
                "env": null
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Some("abc"));
        let request = CreateFollowUpAttempt::retry(
            "try again",
            None,
            "proc-9",
            RetryOptions {
                force_when_dirty: false,
                perform_git_reset: true,
            },
        );

        api.follow_up("sess-1", &request).await.unwrap();
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions/sess-1/follow-up"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "timeout"})),
            )
            .mount(&server)
            .await;

        let api = api_for(&server, None);
        let err = api
            .follow_up("sess-1", &CreateFollowUpAttempt::follow_up("hi", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Api { status: 200, .. }));
        assert_eq!(err.user_message().as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_server_error_without_json_has_no_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let api = api_for(&server, None);
        let err = api
            .follow_up("sess-1", &CreateFollowUpAttempt::follow_up("hi", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Api { status: 502, message: None }));
    }

    #[tokio::test]
    async fn test_empty_success_body_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions/sess-1/follow-up"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, None);
        api.follow_up("sess-1", &CreateFollowUpAttempt::follow_up("hi", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let api = api_for(&server, None);
        let err = api
            .follow_up("sess-1", &CreateFollowUpAttempt::follow_up("hi", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_session_id_is_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions/a%2Fb/follow-up"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, None);
        api.follow_up("a/b", &CreateFollowUpAttempt::follow_up("hi", None))
            .await
            .unwrap();
    }
}
