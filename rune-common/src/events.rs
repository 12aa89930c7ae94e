//! Event types for the rune site runtime
//!
//! Provides the shared SiteEvent definitions and the EventBus used by
//! the session components to report what they did.

use crate::track::{PlayerMode, TranscriptOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Site runtime events
///
/// Events are broadcast via EventBus and serialize with a `type` tag so
/// that hosts can forward them to analytics or logging hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SiteEvent {
    /// Every fragment placeholder discovered at startup has settled
    IncludesLoaded {
        /// Placeholders processed
        total: usize,
        /// Placeholders that rendered the failure notice
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// An in-place transition was admitted
    NavigationStarted {
        url: String,
        /// True for back/forward motion
        history_motion: bool,
        timestamp: DateTime<Utc>,
    },

    /// An in-place transition finished splicing the new page
    NavigationCompleted {
        url: String,
        /// Page identity of the new page (empty when undeclared)
        page_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An in-place transition was abandoned for a full navigation
    NavigationFellBack {
        url: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A navigation request arrived while another was in flight
    NavigationDropped {
        url: String,
        timestamp: DateTime<Utc>,
    },

    /// The player's active track changed
    TrackSelected {
        slug: Option<String>,
        title: String,
        autoplay: bool,
        timestamp: DateTime<Utc>,
    },

    /// A transcript load reached its terminal state
    TranscriptLoaded {
        source: Option<String>,
        outcome: TranscriptOutcome,
        timestamp: DateTime<Utc>,
    },

    /// The player display mode was (re)applied
    PlayerModeChanged {
        mode: PlayerMode,
        timestamp: DateTime<Utc>,
    },
}

impl SiteEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SiteEvent::IncludesLoaded { .. } => "IncludesLoaded",
            SiteEvent::NavigationStarted { .. } => "NavigationStarted",
            SiteEvent::NavigationCompleted { .. } => "NavigationCompleted",
            SiteEvent::NavigationFellBack { .. } => "NavigationFellBack",
            SiteEvent::NavigationDropped { .. } => "NavigationDropped",
            SiteEvent::TrackSelected { .. } => "TrackSelected",
            SiteEvent::TranscriptLoaded { .. } => "TranscriptLoaded",
            SiteEvent::PlayerModeChanged { .. } => "PlayerModeChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for session-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use rune_common::events::{EventBus, SiteEvent};
/// use rune_common::PlayerMode;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SiteEvent::PlayerModeChanged {
///     mode: PlayerMode::Expanded,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "PlayerModeChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SiteEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SiteEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: SiteEvent) -> Result<usize, broadcast::error::SendError<SiteEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SiteEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
