use std::fmt;

/// Errors surfaced by the API client layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No response was received (DNS, connection refused, reset, timeout).
    Network(String),
    /// The backend answered with a non-2xx status.
    Http { status: u16, message: String },
    /// The backend answered 2xx but the body was not the expected JSON.
    Parse(String),
    /// Rejected before sending, e.g. an id that cannot be a path segment.
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status for `Http` errors, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// The text shown in a screen's error banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Unable to reach the server. Check your connection.".to_string(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Parse(_) => "The server sent an unexpected response.".to_string(),
            ApiError::InvalidRequest(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            ApiError::Parse(msg) => write!(f, "parse error: {msg}"),
            ApiError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
