//! Per-widget transcript record
//!
//! Reset on every track selection; stamped once a fetch for the current
//! source finishes, whatever the outcome, so failures are not retried
//! until the selection changes again.

use crate::fetch::FetchError;
use rune_common::TranscriptOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptState {
    /// The active track declares no transcript source
    Unavailable,
    /// Nothing has been loaded for `source` since it became active
    Pending { source: String },
    /// A fetch for `source` completed
    Loaded {
        source: String,
        outcome: TranscriptOutcome,
    },
}

impl TranscriptState {
    pub fn for_source(source: Option<&str>) -> Self {
        match source {
            Some(source) => TranscriptState::Pending {
                source: source.to_string(),
            },
            None => TranscriptState::Unavailable,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            TranscriptState::Unavailable => None,
            TranscriptState::Pending { source } | TranscriptState::Loaded { source, .. } => {
                Some(source)
            }
        }
    }

    /// Whether the display already holds a terminal value for the source
    pub fn is_loaded(&self) -> bool {
        !matches!(self, TranscriptState::Pending { .. })
    }
}

/// Classify a finished fetch
pub fn classify(result: &Result<String, FetchError>) -> TranscriptOutcome {
    match result {
        Ok(body) if !body.trim().is_empty() => TranscriptOutcome::Text,
        Ok(_) => TranscriptOutcome::Blank,
        Err(_) => TranscriptOutcome::Error,
    }
}
