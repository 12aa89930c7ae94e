//! Page session
//!
//! Wires the four components around one shared document and routes host
//! events (clicks, key presses, disclosure toggles, history motion) to
//! the controller that owns them.

use crate::dom::{Document, NodeId, Selector};
use crate::error::Result;
use crate::fetch::{FetchRequest, Fetcher, HttpFetcher};
use crate::fragments::{FragmentCache, FragmentLoader, IncludeSummary};
use crate::host::{HistoryState, Host, MediaElement, MemoryHost};
use crate::hydrate::{style_text, HydrationReport, Hydrator};
use crate::navigation::{
    decide_link, page_id, update_nav_active, LinkActivation, LinkDecision, Modifiers,
    NavigationController, NavigationKind, NavigationOutcome,
};
use crate::player::{Key, PlayerController, PlayerDeps, PlayerSlot};
use crate::SharedDocument;
use rune_common::{EventBus, PlayerMode, SessionConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Event delivered by the host
#[derive(Debug, Clone)]
pub enum DomEvent {
    Click {
        target: NodeId,
        button: u16,
        modifiers: Modifiers,
        default_prevented: bool,
    },
    KeyDown {
        target: NodeId,
        key: Key,
    },
    /// A disclosure element opened or closed
    DisclosureToggled {
        target: NodeId,
        open: bool,
    },
    PopState {
        state: Option<HistoryState>,
    },
}

impl DomEvent {
    /// Plain primary-button click
    pub fn click(target: NodeId) -> Self {
        DomEvent::Click {
            target,
            button: 0,
            modifiers: Modifiers::default(),
            default_prevented: false,
        }
    }

    pub fn key(target: NodeId, key: &str) -> Self {
        DomEvent::KeyDown {
            target,
            key: Key::from_dom(key),
        }
    }
}

/// What the host should do after dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Suppress the platform's default action
    pub default_prevented: bool,
    /// Transition started by this event, if any
    pub navigation: Option<NavigationOutcome>,
}

impl Dispatch {
    fn prevented() -> Self {
        Self {
            default_prevented: true,
            navigation: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    pub includes: IncludeSummary,
    pub hydration: HydrationReport,
    pub page_id: String,
    /// None when the document has no player widget
    pub player_mode: Option<PlayerMode>,
}

pub struct Session {
    doc: SharedDocument,
    host: Arc<dyn Host>,
    events: EventBus,
    hydrator: Arc<Hydrator>,
    fragments: FragmentLoader,
    player: Arc<PlayerSlot>,
    navigation: NavigationController,
}

impl Session {
    /// Build a session over `document`
    ///
    /// Custom properties declared in the document's `<style>` elements
    /// seed the hydrator's token map.
    pub fn new(
        document: Document,
        host: Arc<dyn Host>,
        fetcher: Arc<dyn Fetcher>,
        media: Arc<dyn MediaElement>,
        config: &SessionConfig,
    ) -> Self {
        let hydrator = Hydrator::from_stylesheet(&style_text(&document));
        Self::with_hydrator(document, host, fetcher, media, config, hydrator)
    }

    /// Fetch `start` over HTTP and build a headless session on it
    pub async fn connect(
        start: &str,
        config: &SessionConfig,
        media: Arc<dyn MediaElement>,
    ) -> Result<(Self, Arc<MemoryHost>)> {
        let url = Url::parse(start)?;
        let fetcher = Arc::new(HttpFetcher::new(config)?);
        let html = fetcher.get_text(FetchRequest::get(url.clone())).await?;
        let host = Arc::new(MemoryHost::new(url));
        let session = Self::new(Document::parse(&html), host.clone(), fetcher, media, config);
        Ok((session, host))
    }

    pub fn with_hydrator(
        document: Document,
        host: Arc<dyn Host>,
        fetcher: Arc<dyn Fetcher>,
        media: Arc<dyn MediaElement>,
        config: &SessionConfig,
        hydrator: Hydrator,
    ) -> Self {
        let doc: SharedDocument = Arc::new(RwLock::new(document));
        let events = EventBus::new(config.event_capacity);
        let hydrator = Arc::new(hydrator);

        let fragments = FragmentLoader::new(
            Arc::new(FragmentCache::new()),
            fetcher.clone(),
            events.clone(),
            &config.labels,
        );
        let player = Arc::new(PlayerSlot::new(
            PlayerDeps {
                doc: doc.clone(),
                host: host.clone(),
                media,
                fetcher: fetcher.clone(),
                events: events.clone(),
                labels: config.labels.clone(),
            },
            &config.tracks_page,
        ));
        let navigation = NavigationController::new(
            doc.clone(),
            host.clone(),
            fetcher,
            hydrator.clone(),
            player.clone(),
            events.clone(),
            &config.navigation_marker,
        );

        Self {
            doc,
            host,
            events,
            hydrator,
            fragments,
            player,
            navigation,
        }
    }

    pub fn document(&self) -> SharedDocument {
        self.doc.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn fragments(&self) -> &FragmentLoader {
        &self.fragments
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    /// The player controller, attaching it if the widget is present
    pub async fn player(&self) -> Option<Arc<PlayerController>> {
        self.player.get_or_attach().await
    }

    /// Initial page entry
    ///
    /// Loads fragments, then hydrates the whole document, highlights the
    /// current nav link and lets the player adopt the page's mode, then
    /// stamps the first history position with the current URL.
    pub async fn start(&self) -> StartupReport {
        let location = self.host.location();
        let includes = self.fragments.load_all(&self.doc, &location).await;

        let (hydration, page_id) = {
            let mut doc = self.doc.write().await;
            let root = doc.root();
            let hydration = self
                .hydrator
                .run(&mut doc, root, rune_common::time::current_year());
            let page_id = page_id(&doc);
            update_nav_active(&mut doc, &page_id);
            (hydration, page_id)
        };

        let player_mode = self.player.adopt_for_page(&page_id).await;
        self.host.replace_state(HistoryState::for_url(&location));

        info!(
            "Session started on {} (page '{}', player {})",
            location,
            page_id,
            player_mode.map(|m| m.to_string()).unwrap_or_else(|| "absent".to_string())
        );
        StartupReport {
            includes,
            hydration,
            page_id,
            player_mode,
        }
    }

    /// Route one host event
    pub async fn dispatch(&self, event: DomEvent) -> Dispatch {
        match event {
            DomEvent::Click {
                target,
                button,
                modifiers,
                default_prevented,
            } => {
                self.on_click(LinkActivation {
                    target,
                    button,
                    modifiers,
                    default_prevented,
                })
                .await
            }
            DomEvent::KeyDown { target, key } => self.on_key(target, &key).await,
            DomEvent::DisclosureToggled { target, open } => {
                if let Some(player) = self.player.current().await {
                    if player.is_disclosure(target) {
                        player.disclosure_toggled(open).await;
                    }
                }
                Dispatch::default()
            }
            DomEvent::PopState { state } => Dispatch {
                default_prevented: false,
                navigation: Some(self.navigation.pop_state(state).await),
            },
        }
    }

    async fn on_click(&self, click: LinkActivation) -> Dispatch {
        if let Some(player) = self.player.current().await {
            let (control, toggle) = {
                let doc = self.doc.read().await;
                (
                    doc.closest(click.target, &Selector::class("album-track-button")),
                    doc.closest(click.target, &Selector::class("album-toggle")),
                )
            };
            if let Some(control) = control.filter(|c| player.control_index(*c).is_some()) {
                player.activate(control).await;
            } else if toggle.is_some_and(|t| player.is_toggle(t)) {
                let mode = player.toggle_mode().await;
                debug!("Toggle switched player to {}", mode);
            }
        }

        let decision = {
            let doc = self.doc.read().await;
            decide_link(&doc, &self.host.location(), &click)
        };
        match decision {
            LinkDecision::Default => Dispatch::default(),
            LinkDecision::SameLocation => Dispatch::prevented(),
            LinkDecision::Transition(url) => Dispatch {
                default_prevented: true,
                navigation: Some(self.navigation.load(url.as_str(), NavigationKind::Push).await),
            },
        }
    }

    async fn on_key(&self, target: NodeId, key: &Key) -> Dispatch {
        let mut dispatch = Dispatch::default();
        if let Some(player) = self.player.current().await {
            let control = {
                let doc = self.doc.read().await;
                doc.closest(target, &Selector::class("album-track-button"))
            };
            if let Some(control) = control {
                dispatch.default_prevented = player.handle_key(control, key).await;
            }
        }

        if let Key::Character(c) = key {
            if c.eq_ignore_ascii_case(&'g') {
                let toggled = toggle_ascii_glitch(&mut *self.doc.write().await);
                debug!("Toggled glitch on {} ascii block(s)", toggled);
            }
        }
        dispatch
    }
}

/// Flip the `glitch` class on every `.ascii` node
pub fn toggle_ascii_glitch(doc: &mut Document) -> usize {
    let nodes = doc.select_all(doc.root(), &Selector::class("ascii"));
    for node in &nodes {
        doc.toggle_class(*node, "glitch");
    }
    nodes.len()
}
