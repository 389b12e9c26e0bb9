use thiserror::Error;

/// Errors raised by the realtime store client
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    #[error("Request rejected with status {status}: {message}")]
    RequestRejected { status: u16, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication revoked")]
    AuthRevoked,
}

impl RealtimeError {
    pub fn subscription<T: std::fmt::Display>(msg: T) -> Self {
        Self::SubscriptionError(msg.to_string())
    }

    pub fn invalid_path<T: std::fmt::Display>(msg: T) -> Self {
        Self::InvalidPath(msg.to_string())
    }
}
