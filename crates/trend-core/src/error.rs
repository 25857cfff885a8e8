//! Error types shared by the clients, the store and the binaries.
//!
//! [`AppError`] is the user-facing taxonomy: every variant displays as one
//! fixed message. Client failures are captured as [`ApiFailure`] and then
//! classified once the retry budget is spent.

use thiserror::Error;

/// Which external service produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Search,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Check your API key (401 Unauthorized)")]
    ApiKeyInvalid,
    #[error("Search quota or rate limit exceeded (429 Too Many Requests)")]
    RateLimitExceeded,
    #[error("Invalid request (check the API parameters)")]
    BadRequest,
    #[error("The search server returned an error. Please try again later (5xx Server Error)")]
    ServerError,
    #[error("Check your network connection (timeout or connection error)")]
    NetworkError,
    #[error("An error occurred during AI summarization")]
    AiError,
    #[error("No search results found")]
    NoResults,
    #[error("Failed to access the history file")]
    FileError,
    #[error("Please enter a search keyword")]
    EmptyInput,
    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

impl AppError {
    /// Stable identifier, used in log events
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ApiKeyInvalid => "api_key_invalid",
            AppError::RateLimitExceeded => "rate_limit_exceeded",
            AppError::BadRequest => "bad_request",
            AppError::ServerError => "server_error",
            AppError::NetworkError => "network_error",
            AppError::AiError => "ai_error",
            AppError::NoResults => "no_results",
            AppError::FileError => "file_error",
            AppError::EmptyInput => "empty_input",
            AppError::Unknown(_) => "unknown",
        }
    }

    /// Map a failed call to its error kind.
    ///
    /// The HTTP status wins when present. Failures without one (transport
    /// errors, SDK-style messages) fall back to inspecting the message text.
    pub fn classify(failure: &ApiFailure, service: Service) -> Self {
        if let Some(status) = failure.status {
            if let Some(kind) = Self::from_status(status) {
                return kind;
            }
        }
        Self::from_message(&failure.message, service)
    }

    fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(AppError::ApiKeyInvalid),
            429 => Some(AppError::RateLimitExceeded),
            400 => Some(AppError::BadRequest),
            500 | 502 | 503 => Some(AppError::ServerError),
            _ => None,
        }
    }

    fn from_message(message: &str, service: Service) -> Self {
        let msg = message.to_lowercase();
        if msg.contains("401") || (msg.contains("invalid") && msg.contains("api")) {
            AppError::ApiKeyInvalid
        } else if msg.contains("429") || msg.contains("limit") {
            AppError::RateLimitExceeded
        } else if msg.contains("400") {
            AppError::BadRequest
        } else if ["500", "502", "503"].iter().any(|code| msg.contains(code)) {
            AppError::ServerError
        } else {
            match service {
                Service::Search => AppError::NetworkError,
                Service::Ai => AppError::AiError,
            }
        }
    }
}

/// A single failed call to an external API, before classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Errors raised inside the search history store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Search not found: {0}")]
    NotFound(String),
    #[error("Malformed history file: {0}")]
    Malformed(String),
    #[error("History file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
