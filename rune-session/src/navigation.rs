//! Navigation Controller
//!
//! Turns same-origin link activations and history motion into in-place
//! transitions: fetch the next page, splice its `<main>` and head
//! metadata into the live document, then re-run page entry (hydration,
//! nav highlighting, player mode). At most one transition is in flight;
//! requests arriving meanwhile are dropped, not queued.
//!
//! Nothing in the live document is touched until the fetched page has
//! been validated, so any failure can fall back to a full navigation.

use crate::dom::{Document, NodeId, Selector};
use crate::fetch::{FetchError, FetchRequest, Fetcher, NAVIGATION_MARKER_HEADER};
use crate::host::{HistoryState, Host};
use crate::hydrate::{style_text, Hydrator};
use crate::player::PlayerSlot;
use crate::SharedDocument;
use rune_common::events::{EventBus, SiteEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Why an in-place transition had to be abandoned
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("fetched page has no <main> element")]
    MissingMain,

    #[error("live document has no <main> element")]
    MissingLiveMain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Link activation: scroll to top and push a history entry
    Push,
    /// Back/forward: keep scroll position and replace the entry
    HistoryMotion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Completed { url: Url, page_id: String },
    /// Handed off to a full navigation
    FellBack { url: String, reason: String },
    /// Another transition was in flight
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.alt || self.ctrl || self.meta || self.shift
    }
}

/// A click as seen by the link filter
#[derive(Debug, Clone, Copy)]
pub struct LinkActivation {
    pub target: NodeId,
    /// 0 is the primary button
    pub button: u16,
    pub modifiers: Modifiers,
    pub default_prevented: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// Leave the click to the platform
    Default,
    /// Suppress the click; it points at the current location
    SameLocation,
    /// Suppress the click and transition in place
    Transition(Url),
}

/// Decide how a click should be handled
pub fn decide_link(doc: &Document, location: &Url, click: &LinkActivation) -> LinkDecision {
    if click.default_prevented || click.button != 0 || click.modifiers.any() {
        return LinkDecision::Default;
    }
    let Some(anchor) = doc.closest(click.target, &Selector::tag("a")) else {
        return LinkDecision::Default;
    };
    if doc.has_attr(anchor, "download") {
        return LinkDecision::Default;
    }
    if let Some(target) = doc.attr(anchor, "target") {
        if !target.is_empty() && !target.eq_ignore_ascii_case("_self") {
            return LinkDecision::Default;
        }
    }
    let href = match doc.attr(anchor, "href") {
        Some(href) if !href.is_empty() && !href.starts_with('#') => href,
        _ => return LinkDecision::Default,
    };
    if doc.attr(anchor, "data-no-pjax") == Some("true") {
        return LinkDecision::Default;
    }
    let Ok(url) = location.join(href) else {
        return LinkDecision::Default;
    };
    if url.origin() != location.origin() {
        return LinkDecision::Default;
    }
    if url == *location {
        LinkDecision::SameLocation
    } else {
        LinkDecision::Transition(url)
    }
}

/// Key a nav link by its href: trailing `.html`, then trailing `/`, removed
pub fn nav_key(href: &str) -> &str {
    let key = href.strip_suffix(".html").unwrap_or(href);
    key.strip_suffix('/').unwrap_or(key)
}

/// Mark the `.nav-link` whose key equals `page_id` as the current page
pub fn update_nav_active(doc: &mut Document, page_id: &str) {
    for link in doc.select_all(doc.root(), &Selector::class("nav-link")) {
        let key = nav_key(doc.attr(link, "href").unwrap_or("")).to_string();
        if !key.is_empty() && key == page_id {
            doc.set_attr(link, "aria-current", "page");
        } else {
            doc.remove_attr(link, "aria-current");
        }
    }
}

/// Page identity declared on `<body>`
pub fn page_id(doc: &Document) -> String {
    doc.body()
        .and_then(|body| doc.attr(body, "data-page"))
        .unwrap_or("")
        .to_string()
}

/// Clears the in-flight flag when the transition ends, whatever the path
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct NavigationController {
    doc: SharedDocument,
    host: Arc<dyn Host>,
    fetcher: Arc<dyn Fetcher>,
    hydrator: Arc<Hydrator>,
    player: Arc<PlayerSlot>,
    events: EventBus,
    marker: String,
    navigating: AtomicBool,
}

impl NavigationController {
    pub fn new(
        doc: SharedDocument,
        host: Arc<dyn Host>,
        fetcher: Arc<dyn Fetcher>,
        hydrator: Arc<Hydrator>,
        player: Arc<PlayerSlot>,
        events: EventBus,
        marker: &str,
    ) -> Self {
        Self {
            doc,
            host,
            fetcher,
            hydrator,
            player,
            events,
            marker: marker.to_string(),
            navigating: AtomicBool::new(false),
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.navigating.load(Ordering::Acquire)
    }

    /// Run one transition to `target` (resolved against the current location)
    pub async fn load(&self, target: &str, kind: NavigationKind) -> NavigationOutcome {
        let location = self.host.location();
        let url = match location.join(target) {
            Ok(url) if url.origin() == location.origin() => url,
            Ok(url) => return self.fall_back(url.as_str(), "cross-origin target"),
            Err(e) => return self.fall_back(target, &format!("unparsable target: {}", e)),
        };

        let Some(_in_flight) = InFlight::acquire(&self.navigating) else {
            debug!("Navigation to {} dropped, another is in flight", url);
            self.events.emit_lossy(SiteEvent::NavigationDropped {
                url: url.to_string(),
                timestamp: rune_common::time::now(),
            });
            return NavigationOutcome::Dropped;
        };

        info!("Navigating in place to {}", url);
        self.events.emit_lossy(SiteEvent::NavigationStarted {
            url: url.to_string(),
            history_motion: kind == NavigationKind::HistoryMotion,
            timestamp: rune_common::time::now(),
        });

        match self.transition(&url, kind).await {
            Ok(page_id) => {
                self.events.emit_lossy(SiteEvent::NavigationCompleted {
                    url: url.to_string(),
                    page_id: page_id.clone(),
                    timestamp: rune_common::time::now(),
                });
                NavigationOutcome::Completed { url, page_id }
            }
            Err(e) => self.fall_back(url.as_str(), &e.to_string()),
        }
    }

    /// Back/forward motion delivered by the host
    pub async fn pop_state(&self, state: Option<HistoryState>) -> NavigationOutcome {
        let url = match state {
            Some(state) => state.url,
            None => self.host.location().to_string(),
        };
        self.load(&url, NavigationKind::HistoryMotion).await
    }

    fn fall_back(&self, url: &str, reason: &str) -> NavigationOutcome {
        warn!("Falling back to full navigation to {}: {}", url, reason);
        self.host.assign(url);
        self.events.emit_lossy(SiteEvent::NavigationFellBack {
            url: url.to_string(),
            reason: reason.to_string(),
            timestamp: rune_common::time::now(),
        });
        NavigationOutcome::FellBack {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    async fn transition(&self, url: &Url, kind: NavigationKind) -> Result<String, NavigationError> {
        let request =
            FetchRequest::get(url.clone()).header(NAVIGATION_MARKER_HEADER, &self.marker);
        let html = self.fetcher.get_text(request).await?;
        let fetched = Document::parse(&html);
        let new_main = fetched
            .select_first(fetched.root(), &Selector::tag("main"))
            .ok_or(NavigationError::MissingMain)?;

        let page_id = {
            let mut doc = self.doc.write().await;
            let live_main = doc
                .select_first(doc.root(), &Selector::tag("main"))
                .ok_or(NavigationError::MissingLiveMain)?;

            let location = self.host.location();
            merge_stylesheets(&mut doc, &fetched, &location, url);
            sync_description(&mut doc, &fetched);
            sync_body_attributes(&mut doc, &fetched);

            doc.clear_children(live_main);
            for child in fetched.children(new_main).to_vec() {
                let copy = doc.import_node(&fetched, child);
                doc.append_child(live_main, copy);
            }
            if let Some(title) = fetched.title().filter(|t| !t.is_empty()) {
                doc.set_title(&title);
            }

            let merged = self.hydrator.merge_stylesheet(&style_text(&fetched));
            if merged > 0 {
                debug!("Merged {} custom properties from {}", merged, url);
            }
            let report = self
                .hydrator
                .run(&mut doc, live_main, rune_common::time::current_year());
            debug!("Hydrated new main: {:?}", report);

            let page_id = page_id(&doc);
            update_nav_active(&mut doc, &page_id);
            page_id
        };

        if let Some(mode) = self.player.adopt_for_page(&page_id).await {
            debug!("Player adopted {} mode for page '{}'", mode, page_id);
        }

        match kind {
            NavigationKind::Push => {
                self.host.scroll_to_top();
                self.host.push_state(HistoryState::for_url(url));
            }
            NavigationKind::HistoryMotion => {
                self.host.replace_state(HistoryState::for_url(url));
            }
        }
        Ok(page_id)
    }
}

fn stylesheet_selector() -> Selector {
    Selector::tag("link").with_attr_eq("rel", "stylesheet")
}

/// Append stylesheets from the fetched head that the live head lacks
///
/// Live links resolve against the current location, fetched ones against
/// the page they came from; appended copies carry the absolute URL.
fn merge_stylesheets(doc: &mut Document, fetched: &Document, location: &Url, source: &Url) {
    let Some(head) = doc.head() else {
        return;
    };
    let mut existing: Vec<Url> = doc
        .select_all(head, &stylesheet_selector())
        .into_iter()
        .filter_map(|link| location.join(doc.attr(link, "href")?).ok())
        .collect();

    let Some(fetched_head) = fetched.head() else {
        return;
    };
    for link in fetched.select_all(fetched_head, &stylesheet_selector()) {
        let Some(absolute) = fetched
            .attr(link, "href")
            .filter(|href| !href.is_empty())
            .and_then(|href| source.join(href).ok())
        else {
            continue;
        };
        if existing.contains(&absolute) {
            continue;
        }
        let copy = doc.import_node(fetched, link);
        doc.set_attr(copy, "href", absolute.as_str());
        doc.append_child(head, copy);
        debug!("Added stylesheet {}", absolute);
        existing.push(absolute);
    }
}

fn sync_description(doc: &mut Document, fetched: &Document) {
    let selector = Selector::tag("meta").with_attr_eq("name", "description");
    let Some(incoming) = fetched.select_first(fetched.root(), &selector) else {
        return;
    };
    let Some(head) = doc.head() else {
        return;
    };
    match doc.select_first(head, &selector) {
        Some(current) => {
            let content = fetched.attr(incoming, "content").unwrap_or("").to_string();
            doc.set_attr(current, "content", &content);
        }
        None => {
            let copy = doc.import_node(fetched, incoming);
            doc.append_child(head, copy);
        }
    }
}

/// Replace the live body's class and `data-*` attributes with the fetched ones
fn sync_body_attributes(doc: &mut Document, fetched: &Document) {
    let (Some(body), Some(fetched_body)) = (doc.body(), fetched.body()) else {
        return;
    };

    match fetched.attr(fetched_body, "class") {
        Some(class) => doc.set_attr(body, "class", class),
        None => {
            doc.remove_attr(body, "class");
        }
    }

    for (name, _) in doc.attr_pairs(body) {
        if name.starts_with("data-") {
            doc.remove_attr(body, &name);
        }
    }
    for (name, value) in fetched.attr_pairs(fetched_body) {
        if name.starts_with("data-") {
            doc.set_attr(body, &name, &value);
        }
    }
}
