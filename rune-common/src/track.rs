//! Track and player mode types
//!
//! Tracks are declared statically in the rendered page (one control per
//! track); the runtime only reads them. Only the active flag and the
//! transcript state derived from them change at runtime.

use serde::{Deserialize, Serialize};

/// One playlist entry as declared by its track control
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Stable key, unique within a playlist
    pub slug: Option<String>,
    /// Display title
    pub title: String,
    pub year: Option<String>,
    pub description: Option<String>,
    /// Audio source URI; a track without one cannot be selected
    pub audio: Option<String>,
    /// Transcript (lyrics) source URI
    pub transcript: Option<String>,
}

impl Track {
    /// Secondary line shown under the title: `year — description`
    ///
    /// Returns None when neither part is present.
    pub fn meta_line(&self) -> Option<String> {
        let parts: Vec<&str> = [self.year.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" — "))
        }
    }
}

/// Trim a declared attribute value, mapping blank values to None
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Player display mode
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlayerMode {
    /// Full console with the track list and lyrics disclosure
    Expanded,
    /// Collapsed mini player
    #[default]
    Compact,
}

impl PlayerMode {
    /// Parse a mode value leniently: anything other than `expanded` is compact
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("expanded") => PlayerMode::Expanded,
            _ => PlayerMode::Compact,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerMode::Expanded => "expanded",
            PlayerMode::Compact => "compact",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            PlayerMode::Expanded => PlayerMode::Compact,
            PlayerMode::Compact => PlayerMode::Expanded,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, PlayerMode::Expanded)
    }
}

impl std::fmt::Display for PlayerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a transcript load
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptOutcome {
    /// Non-blank text was fetched and shown
    Text,
    /// Fetched, but the body was blank
    Blank,
    /// Non-success status or network failure
    Error,
    /// The active track declares no transcript source
    Missing,
}

impl std::fmt::Display for TranscriptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptOutcome::Text => write!(f, "Text"),
            TranscriptOutcome::Blank => write!(f, "Blank"),
            TranscriptOutcome::Error => write!(f, "Error"),
            TranscriptOutcome::Missing => write!(f, "Missing"),
        }
    }
}
