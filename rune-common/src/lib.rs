//! # Rune Common Library
//!
//! Shared code for the rune site runtime crates:
//! - Error types
//! - Session configuration loading
//! - Site event types (SiteEvent enum) and the EventBus
//! - Track and player mode types
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod track;

pub use config::{Labels, SessionConfig};
pub use error::{Error, Result};
pub use events::{EventBus, SiteEvent};
pub use track::{PlayerMode, Track, TranscriptOutcome};
