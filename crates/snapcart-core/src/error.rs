use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapcartError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target time '{value}': {reason}")]
    InvalidTargetTime { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SnapcartError>;
