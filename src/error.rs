use std::fmt;
use std::io;
use thiserror::Error;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, IntrospectError>;

/// Errors that can occur while fetching, analyzing or storing repository data
#[derive(Debug, Error)]
pub enum IntrospectError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP transport errors (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite errors from the report store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// A remote API answered with a non-success status
    #[error("{service} API error: {url} returned status {status}: {body}")]
    Api {
        /// Which upstream service answered
        service: &'static str,
        /// The requested URL, with credentials stripped
        url: String,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// API rate limit exceeded errors
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// A response body did not have the expected shape
    #[error("Decode error: {message} (response: {raw})")]
    Decode {
        /// What failed to decode
        message: String,
        /// The raw body, kept for diagnosis
        raw: String,
    },

    /// Language model errors reported inside a successful response
    #[error("LLM error: {0}")]
    Llm(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// General message errors
    #[error("{0}")]
    Message(String),
}

impl IntrospectError {
    /// Creates a new error with the specified message
    pub fn new(message: &str) -> Self {
        Self::Message(message.to_string())
    }

    /// Builds a decode error that keeps the offending body around
    pub fn decode(message: impl fmt::Display, raw: impl Into<String>) -> Self {
        Self::Decode {
            message: message.to_string(),
            raw: raw.into(),
        }
    }

    /// Whether the failure is likely to clear up on its own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http(_) | Self::RateLimitExceeded(_) | Self::IO(_)
        )
    }

    /// HTTP status the inbound API should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::RateLimitExceeded(_) => 429,
            _ => 500,
        }
    }
}

/// Steps of the two-stage repository summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStage {
    /// Fetching the tree and asking the model for the critical files
    ScanningStructure,
    /// Fetching the critical files and asking for the summary
    ReadingFiles,
}

impl SummaryStage {
    /// Wire name reported to clients
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScanningStructure => "scanning_structure",
            Self::ReadingFiles => "reading_files",
        }
    }
}

impl fmt::Display for SummaryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with the summary stage that produced it
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    /// Stage that failed
    pub stage: SummaryStage,
    /// Underlying cause
    #[source]
    pub source: IntrospectError,
}

impl StageError {
    /// Returns a closure that tags an error with `stage`, for use with `map_err`
    pub fn at(stage: SummaryStage) -> impl FnOnce(IntrospectError) -> Self {
        move |source| Self { stage, source }
    }
}
