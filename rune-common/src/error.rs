//! Common error types for the rune crates

use thiserror::Error;

/// Common result type for rune operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the rune crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
