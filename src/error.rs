use thiserror::Error;

use crate::llm::CompletionError;

// Every variant is fatal; main reports it and exits with status 1.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("{0} is not set; export it or add it to a .env file")]
    MissingCredential(&'static str),

    #[error("completion service failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no answer was entered")]
    NoAnswer,
}

pub type Result<T> = std::result::Result<T, TutorError>;
