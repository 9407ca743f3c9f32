//! Structured errors shared across the capture and replay crates.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidConfig,
    Io,
    WriterClosed,
    MalformedRecord,
    ChainUnavailable,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, message)
    }

    pub fn io(operation: &str, source: &std::io::Error) -> Self {
        Self::new(ErrorCode::Io, format!("{} failed: {}", operation, source))
    }

    pub fn writer_closed(operation: &str) -> Self {
        Self::new(
            ErrorCode::WriterClosed,
            format!("{} on a closed record writer", operation),
        )
    }

    pub fn malformed_record(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRecord, detail)
    }

    pub fn chain_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::ChainUnavailable, detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::MalformedRecord, e.to_string())
    }
}
