//! Error types for RagDesk.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Embedding or index construction cannot proceed. Fatal at startup.
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Index query failed at request time.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversation ordering rule violated.
    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
