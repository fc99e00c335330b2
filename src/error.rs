use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session API returned {status}{}", detail(.message))]
    Api { status: u16, message: Option<String> },

    #[error("Confirmation gate error: {0}")]
    Gate(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message suitable for showing to the user, if the error carries one.
    ///
    /// Backend rejections only have a message when the server sent one;
    /// local failures always describe themselves.
    pub fn user_message(&self) -> Option<String> {
        match self {
            AppError::Api { message, .. } => message.clone(),
            other => Some(other.to_string()),
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, AppError>;
