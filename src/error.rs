//! Errors that stop the service before it starts serving.
//!
//! Per-request failures never reach this type; they are turned into HTTP
//! responses by the handlers (see [`crate::llm::LlmError`]).

use crate::llm::LlmError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to read env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenv::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StartupError {
    pub fn env_file(path: impl Into<PathBuf>, source: dotenv::Error) -> Self {
        Self::EnvFile {
            path: path.into(),
            source,
        }
    }
}
