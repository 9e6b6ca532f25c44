//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] desk_client::RequestError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AppResult<T> = Result<T, AppError>;
