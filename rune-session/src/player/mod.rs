//! Album player controller
//!
//! Binds to the first `.album-player` widget in the document. The widget
//! owns one audio element, an ordered list of track controls, a lyrics
//! disclosure and a mode toggle. The controller keeps exactly one track
//! active, loads the active track's transcript lazily when the
//! disclosure is open, and flips between expanded and compact display.
//!
//! Lock order is always document first, then the controller's own state.
//! No lock is held across a fetch or a play request.

pub mod keys;
pub mod transcript;

use crate::dom::{Document, NodeId, Selector};
use crate::fetch::{FetchError, FetchRequest, Fetcher};
use crate::host::{Host, MediaElement};
use crate::SharedDocument;
use rune_common::events::{EventBus, SiteEvent};
use rune_common::track::non_blank;
use rune_common::{Labels, PlayerMode, Track, TranscriptOutcome};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub use keys::{resolve_key, Key, KeyAction};
pub use transcript::TranscriptState;

const ROOT_CLASS: &str = "album-player";
const MODE_ATTR: &str = "data-player-mode";

/// Everything a controller needs from the session
#[derive(Clone)]
pub struct PlayerDeps {
    pub doc: SharedDocument,
    pub host: Arc<dyn Host>,
    pub media: Arc<dyn MediaElement>,
    pub fetcher: Arc<dyn Fetcher>,
    pub events: EventBus,
    pub labels: Labels,
}

/// A track control and the track it declares
#[derive(Debug, Clone)]
pub struct TrackControl {
    pub node: NodeId,
    pub track: Track,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Start playback even if the element was not already playing
    pub autoplay: bool,
}

impl SelectOptions {
    pub fn autoplay() -> Self {
        Self { autoplay: true }
    }
}

#[derive(Debug, Clone, Copy)]
struct WidgetNodes {
    root: NodeId,
    audio: NodeId,
    title: Option<NodeId>,
    meta: Option<NodeId>,
    lyrics: Option<NodeId>,
    transcript: Option<NodeId>,
    toggle: Option<NodeId>,
    toggle_label: Option<NodeId>,
}

struct Discovered {
    nodes: WidgetNodes,
    controls: Vec<TrackControl>,
    initial: usize,
    placeholder: Option<String>,
}

#[derive(Debug)]
struct PlayerState {
    active: usize,
    transcript: TranscriptState,
}

pub struct PlayerController {
    deps: PlayerDeps,
    nodes: WidgetNodes,
    controls: Vec<TrackControl>,
    placeholder: String,
    state: Mutex<PlayerState>,
}

impl PlayerController {
    /// Discover the widget and initialize it
    ///
    /// Returns None when the document has no complete widget (root, audio
    /// element and at least one track control).
    pub async fn attach(deps: PlayerDeps) -> Option<Self> {
        let found = {
            let doc = deps.doc.read().await;
            discover(&doc)
        };
        let Some(found) = found else {
            debug!("No album player in document");
            return None;
        };

        let placeholder = found
            .placeholder
            .unwrap_or_else(|| deps.labels.transcript_placeholder.clone());
        let controller = Self {
            deps,
            nodes: found.nodes,
            controls: found.controls,
            placeholder,
            state: Mutex::new(PlayerState {
                active: found.initial,
                transcript: TranscriptState::Unavailable,
            }),
        };
        controller.initialize(found.initial).await;
        info!(
            "Album player attached with {} track(s), initial index {}",
            controller.controls.len(),
            found.initial
        );
        Some(controller)
    }

    async fn initialize(&self, initial: usize) {
        {
            let mut doc = self.deps.doc.write().await;
            if let Some(body) = self.nodes.transcript {
                if doc.text_content(body).trim().is_empty() {
                    doc.set_text_content(body, &self.placeholder);
                }
            }
        }

        let declared = self.mode().await;
        self.set_mode(declared, true).await;
        self.select_track(initial, SelectOptions::default()).await;

        let mut doc = self.deps.doc.write().await;
        doc.set_attr(self.nodes.root, "data-js-init", "1");
    }

    pub fn root(&self) -> NodeId {
        self.nodes.root
    }

    pub fn controls(&self) -> &[TrackControl] {
        &self.controls
    }

    pub fn control_index(&self, node: NodeId) -> Option<usize> {
        self.controls.iter().position(|c| c.node == node)
    }

    pub fn is_toggle(&self, node: NodeId) -> bool {
        self.nodes.toggle == Some(node)
    }

    pub fn is_disclosure(&self, node: NodeId) -> bool {
        self.nodes.lyrics == Some(node)
    }

    pub fn active_index(&self) -> usize {
        self.state.lock().unwrap().active
    }

    pub fn active_track(&self) -> Option<Track> {
        self.controls
            .get(self.active_index())
            .map(|c| c.track.clone())
    }

    pub fn transcript_state(&self) -> TranscriptState {
        self.state.lock().unwrap().transcript.clone()
    }

    /// Current mode as recorded on the widget root
    pub async fn mode(&self) -> PlayerMode {
        let doc = self.deps.doc.read().await;
        PlayerMode::from_attr(doc.attr(self.nodes.root, MODE_ATTR))
    }

    /// Make the track at `index` active
    ///
    /// Returns false (changing nothing) when the index is out of range or
    /// the track has no audio source.
    pub async fn select_track(&self, index: usize, options: SelectOptions) -> bool {
        let Some(control) = self.controls.get(index) else {
            return false;
        };
        let Some(src) = control.track.audio.as_deref() else {
            debug!("Track {} has no audio source, ignoring selection", index);
            return false;
        };

        let was_playing = !self.deps.media.paused() && !self.deps.media.ended();
        let should_play = options.autoplay || was_playing;

        let lyrics_open = {
            let mut doc = self.deps.doc.write().await;

            if doc.attr(self.nodes.audio, "src") != Some(src) {
                doc.set_attr(self.nodes.audio, "src", src);
                self.deps.media.load(src);
                if !should_play {
                    self.deps.media.pause();
                    if let Err(e) = self.deps.media.rewind() {
                        debug!("Rewind after source swap failed: {}", e);
                    }
                }
            }

            self.render_active(&mut doc, index);

            let transcript = TranscriptState::for_source(control.track.transcript.as_deref());
            if let Some(body) = self.nodes.transcript {
                let text = match transcript {
                    TranscriptState::Unavailable => self.deps.labels.no_transcript.as_str(),
                    _ => self.placeholder.as_str(),
                };
                doc.set_text_content(body, text);
            }

            {
                let mut state = self.state.lock().unwrap();
                state.active = index;
                state.transcript = transcript;
            }

            self.lyrics_open(&doc)
        };

        self.deps.events.emit_lossy(SiteEvent::TrackSelected {
            slug: control.track.slug.clone(),
            title: control.track.title.clone(),
            autoplay: should_play,
            timestamp: rune_common::time::now(),
        });

        if should_play {
            if let Err(e) = self.deps.media.play().await {
                debug!("Playback did not start: {}", e);
            }
        }

        if lyrics_open {
            self.load_lyrics().await;
        }
        true
    }

    fn render_active(&self, doc: &mut Document, index: usize) {
        let item_selector = Selector::class("album-track");
        for (i, control) in self.controls.iter().enumerate() {
            let active = i == index;
            doc.set_class(control.node, "is-active", active);
            doc.set_attr(
                control.node,
                "aria-selected",
                if active { "true" } else { "false" },
            );
            if let Some(item) = doc.closest(control.node, &item_selector) {
                doc.set_class(item, "is-active", active);
            }
        }

        let track = &self.controls[index].track;
        if let Some(title) = self.nodes.title {
            doc.set_text_content(title, &track.title);
        }
        if let Some(meta) = self.nodes.meta {
            match track.meta_line() {
                Some(line) => {
                    doc.set_text_content(meta, &line);
                    doc.remove_attr(meta, "hidden");
                }
                None => {
                    doc.set_text_content(meta, "");
                    doc.set_attr(meta, "hidden", "");
                }
            }
        }
        match track.slug.as_deref() {
            Some(slug) => doc.set_attr(self.nodes.root, "data-active-track", slug),
            None => {
                doc.remove_attr(self.nodes.root, "data-active-track");
            }
        }
    }

    fn lyrics_open(&self, doc: &Document) -> bool {
        self.nodes
            .lyrics
            .map(|d| doc.has_attr(d, "open"))
            .unwrap_or(false)
    }

    /// Load the active track's transcript into the disclosure body
    ///
    /// Does nothing unless the disclosure is open. At most one fetch is
    /// made per source while it stays active; a result that arrives after
    /// the selection moved on is discarded.
    pub async fn load_lyrics(&self) -> Option<TranscriptOutcome> {
        let body = self.nodes.transcript?;
        let source = {
            let mut doc = self.deps.doc.write().await;
            if !self.lyrics_open(&doc) {
                return None;
            }
            let current = self.state.lock().unwrap().transcript.clone();
            match current {
                TranscriptState::Unavailable => {
                    doc.set_text_content(body, &self.deps.labels.no_transcript);
                    return Some(TranscriptOutcome::Missing);
                }
                TranscriptState::Loaded { .. } => return None,
                TranscriptState::Pending { source } => {
                    doc.set_text_content(body, &self.deps.labels.transcript_loading);
                    source
                }
            }
        };

        let result = match self.deps.host.location().join(&source) {
            Ok(url) => self.deps.fetcher.get_text(FetchRequest::get(url)).await,
            Err(e) => Err(FetchError::Network(e.to_string())),
        };
        let outcome = transcript::classify(&result);
        let text = match result {
            Ok(text) if outcome == TranscriptOutcome::Text => text,
            Ok(_) => self.deps.labels.transcript_blank.clone(),
            Err(e) => {
                warn!("Transcript fetch for {} failed: {}", source, e);
                self.deps.labels.transcript_error.clone()
            }
        };

        {
            let mut doc = self.deps.doc.write().await;
            let mut state = self.state.lock().unwrap();
            if state.transcript.source() != Some(source.as_str()) {
                debug!("Discarding stale transcript for {}", source);
                return None;
            }
            doc.set_text_content(body, &text);
            state.transcript = TranscriptState::Loaded {
                source: source.clone(),
                outcome,
            };
        }

        self.deps.events.emit_lossy(SiteEvent::TranscriptLoaded {
            source: Some(source),
            outcome,
            timestamp: rune_common::time::now(),
        });
        Some(outcome)
    }

    /// The host reports the disclosure's new open state
    pub async fn disclosure_toggled(&self, open: bool) -> Option<TranscriptOutcome> {
        if let Some(lyrics) = self.nodes.lyrics {
            let mut doc = self.deps.doc.write().await;
            if open {
                doc.set_attr(lyrics, "open", "");
            } else {
                doc.remove_attr(lyrics, "open");
            }
        }
        if open {
            self.load_lyrics().await
        } else {
            None
        }
    }

    /// Apply `mode` to the widget
    ///
    /// Without `force` this is a no-op when the widget is already in the
    /// requested mode. Compact mode always closes the disclosure.
    pub async fn set_mode(&self, mode: PlayerMode, force: bool) -> bool {
        {
            let mut doc = self.deps.doc.write().await;
            let root = self.nodes.root;
            if !force && doc.attr(root, MODE_ATTR) == Some(mode.as_str()) {
                return false;
            }

            let expanded = mode.is_expanded();
            doc.set_attr(root, MODE_ATTR, mode.as_str());
            doc.set_class(root, "is-compact", !expanded);

            if let Some(toggle) = self.nodes.toggle {
                doc.set_attr(
                    toggle,
                    "aria-expanded",
                    if expanded { "true" } else { "false" },
                );
            }
            if let Some(label) = self.nodes.toggle_label {
                let text = if expanded {
                    &self.deps.labels.toggle_expanded
                } else {
                    &self.deps.labels.toggle_compact
                };
                doc.set_text_content(label, text);
            }
            if !expanded {
                if let Some(lyrics) = self.nodes.lyrics {
                    doc.remove_attr(lyrics, "open");
                }
            }
        }

        self.deps.events.emit_lossy(SiteEvent::PlayerModeChanged {
            mode,
            timestamp: rune_common::time::now(),
        });
        true
    }

    pub async fn expand(&self) -> bool {
        self.set_mode(PlayerMode::Expanded, true).await
    }

    pub async fn compact(&self) -> bool {
        self.set_mode(PlayerMode::Compact, true).await
    }

    /// Flip the mode from the toggle control
    ///
    /// Expanding with the disclosure still open also loads lyrics.
    pub async fn toggle_mode(&self) -> PlayerMode {
        let next = self.mode().await.toggled();
        self.set_mode(next, true).await;
        if next.is_expanded() {
            self.load_lyrics().await;
        }
        next
    }

    /// Click on a track control: select it with autoplay
    pub async fn activate(&self, node: NodeId) -> bool {
        match self.control_index(node) {
            Some(index) => self.select_track(index, SelectOptions::autoplay()).await,
            None => false,
        }
    }

    /// Key press while a track control has focus
    ///
    /// Returns true when the key was handled (and its default should be
    /// suppressed).
    pub async fn handle_key(&self, node: NodeId, key: &Key) -> bool {
        let Some(index) = self.control_index(node) else {
            return false;
        };
        match resolve_key(key, self.active_index(), self.controls.len()) {
            Some(KeyAction::Activate) => {
                self.select_track(index, SelectOptions::autoplay()).await;
                true
            }
            Some(KeyAction::Preview(target)) => {
                {
                    let mut doc = self.deps.doc.write().await;
                    doc.focus(self.controls[target].node);
                }
                self.select_track(target, SelectOptions::default()).await;
                true
            }
            None => false,
        }
    }
}

fn discover(doc: &Document) -> Option<Discovered> {
    let root = doc.select_first(doc.root(), &Selector::class(ROOT_CLASS))?;
    let audio = doc.select_first(root, &Selector::class("album-audio"))?;
    let buttons = doc.select_all(root, &Selector::class("album-track-button"));
    if buttons.is_empty() {
        return None;
    }

    let lyrics = doc.select_first(root, &Selector::class("album-lyrics"));
    let transcript = lyrics.and_then(|d| doc.select_first(d, &Selector::class("transcript-body")));
    let toggle = doc.select_first(root, &Selector::class("album-toggle"));
    let toggle_label = toggle
        .and_then(|t| doc.select_first(t, &Selector::class("album-toggle-label")))
        .or(toggle);

    let item_selector = Selector::class("album-track");
    let initial = buttons
        .iter()
        .position(|b| {
            doc.closest(*b, &item_selector)
                .map(|item| doc.has_class(item, "is-active"))
                .unwrap_or(false)
        })
        .unwrap_or(0);

    let controls = buttons
        .into_iter()
        .map(|node| TrackControl {
            node,
            track: read_track(doc, node),
        })
        .collect();

    Some(Discovered {
        nodes: WidgetNodes {
            root,
            audio,
            title: doc.select_first(root, &Selector::class("album-current-title")),
            meta: doc.select_first(root, &Selector::class("album-current-meta")),
            lyrics,
            transcript,
            toggle,
            toggle_label,
        },
        controls,
        initial,
        placeholder: transcript.and_then(|t| non_blank(doc.attr(t, "data-placeholder"))),
    })
}

fn read_track(doc: &Document, node: NodeId) -> Track {
    let data = |name: &str| non_blank(doc.attr(node, name));
    Track {
        slug: data("data-slug"),
        title: data("data-title").unwrap_or_else(|| doc.text_content(node).trim().to_string()),
        year: data("data-year"),
        description: data("data-description"),
        audio: data("data-audio"),
        transcript: data("data-transcript"),
    }
}

/// Lazily attached controller for the document's widget
///
/// Discovery is retried on each request until a widget is found; after
/// that the same controller is reused for the rest of the session.
pub struct PlayerSlot {
    deps: PlayerDeps,
    tracks_page: String,
    controller: tokio::sync::Mutex<Option<Arc<PlayerController>>>,
}

impl PlayerSlot {
    pub fn new(deps: PlayerDeps, tracks_page: &str) -> Self {
        Self {
            deps,
            tracks_page: tracks_page.to_string(),
            controller: tokio::sync::Mutex::new(None),
        }
    }

    /// The attached controller, attaching it first if needed
    ///
    /// Callers must not hold the document lock.
    pub async fn get_or_attach(&self) -> Option<Arc<PlayerController>> {
        let mut slot = self.controller.lock().await;
        if let Some(controller) = slot.as_ref() {
            return Some(controller.clone());
        }
        let controller = Arc::new(PlayerController::attach(self.deps.clone()).await?);
        *slot = Some(controller.clone());
        Some(controller)
    }

    /// The controller if one was already attached
    pub async fn current(&self) -> Option<Arc<PlayerController>> {
        self.controller.lock().await.clone()
    }

    /// Expand on the tracks page, compact everywhere else
    pub async fn adopt_for_page(&self, page_id: &str) -> Option<PlayerMode> {
        let controller = self.get_or_attach().await?;
        let mode = if page_id == self.tracks_page {
            PlayerMode::Expanded
        } else {
            PlayerMode::Compact
        };
        controller.set_mode(mode, true).await;
        Some(mode)
    }
}
