//! Generation failures. Recovered by the caller, never fatal.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Stream read error: {0}")]
    Stream(String),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("No response within {0:?}")]
    Timeout(Duration),
}
