use thiserror::Error;

/// Main error type for Wikitree
#[derive(Error, Debug)]
pub enum WikitreeError {
    /// Session store errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Article retrieval failed; retrying will not help
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Wikipedia temporarily unavailable (network, 429, 5xx)
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Entity recognizer rejected the request; retrying will not help
    #[error("NER error: {0}")]
    Ner(String),

    /// Entity recognizer temporarily unavailable (network, 429, 5xx)
    #[error("NER unavailable: {0}")]
    NerUnavailable(String),

    /// Named session does not exist in the store
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WikitreeError {
    /// Whether the failed call is worth retrying after a delay.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WikitreeError::NerUnavailable(_) | WikitreeError::RetrievalUnavailable(_)
        )
    }
}

/// Convenient Result type using WikitreeError
pub type Result<T> = std::result::Result<T, WikitreeError>;
