//! Unified error type for the debate bot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
