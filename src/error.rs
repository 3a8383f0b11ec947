//! Error types for the market dataset SDK

use thiserror::Error;

/// Normalized failure of a request against the market data API
///
/// Transport errors never leak past the client: every failure is mapped to one
/// of these variants before it reaches a caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// No response was received (connectivity problem or timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429
    #[error("Rate limit exceeded")]
    RateLimited,

    /// HTTP 404
    #[error("Data not found")]
    NotFound,

    /// HTTP 5xx
    #[error("Server error (HTTP {status})")]
    Server { status: u16 },

    /// Any other failure, including malformed response bodies
    #[error("Unexpected error: {message}")]
    Unknown {
        status: Option<u16>,
        message: String,
    },
}

impl ApiError {
    /// Creates a Network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates an Unknown error without an HTTP status
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown {
            status: None,
            message: msg.into(),
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            404 => Self::NotFound,
            500..=599 => Self::Server { status },
            _ => Self::Unknown {
                status: Some(status),
                message: body.into(),
            },
        }
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(_) => None,
            Self::RateLimited => Some(429),
            Self::NotFound => Some(404),
            Self::Server { status } => Some(*status),
            Self::Unknown { status, .. } => *status,
        }
    }

    /// True for failures worth another attempt at the request level
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Server { .. })
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Network error. Please check your connection.",
            Self::RateLimited => "Rate limit exceeded. Please wait a moment.",
            Self::NotFound => "Data not found.",
            Self::Server { .. } => "Server error. Please try again later.",
            Self::Unknown { .. } => "Something went wrong. Please try again.",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return Self::Network(err.to_string());
        }
        if err.is_decode() || err.is_body() {
            return Self::unknown(format!("Malformed response: {}", err));
        }
        Self::unknown(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::unknown(format!("Malformed response: {}", err))
    }
}
