//! Error type shared across StillOnTime crates.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StillOnTimeError>;

/// Top-level error for all StillOnTime operations.
#[derive(Debug, thiserror::Error)]
pub enum StillOnTimeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Weather error: {0}")]
    Weather(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Auth failed: {0}")]
    AuthFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<String> for StillOnTimeError {
    fn from(s: String) -> Self {
        Self::Store(s)
    }
}
