//! Error types for rune-session
//!
//! Operation-local failures (fetch, navigation, media) are handled where
//! they occur; this enum is what escapes to callers that build sessions.

use crate::fetch::FetchError;
use thiserror::Error;

/// Main error type for rune-session
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience Result type using rune-session Error
pub type Result<T> = std::result::Result<T, Error>;
