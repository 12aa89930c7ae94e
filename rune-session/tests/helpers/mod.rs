//! Test helpers for rune-session integration tests
//!
//! - ScriptedFetcher: canned responses per URL, hit counters, gates
//! - RecordingMedia: media element that records what the player asked
//! - pages: fixture documents for the site
//! - Harness: a started session plus handles to its host and doubles

#![allow(dead_code)]

pub mod fetcher;
pub mod media;
pub mod pages;

pub use fetcher::ScriptedFetcher;
pub use media::RecordingMedia;

use rune_common::SessionConfig;
use rune_session::{MemoryHost, NodeId, Selector, Session, StartupReport};
use std::sync::Arc;

pub struct Harness {
    pub session: Session,
    pub host: Arc<MemoryHost>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub media: Arc<RecordingMedia>,
    pub startup: StartupReport,
}

impl Harness {
    /// Build a session on `path` serving `html`, and run startup
    pub async fn start(path: &str, html: &str, fetcher: ScriptedFetcher) -> Self {
        let host = Arc::new(MemoryHost::new(pages::url(path)));
        let fetcher = Arc::new(fetcher);
        let media = Arc::new(RecordingMedia::new());
        let session = Session::new(
            rune_session::Document::parse(html),
            host.clone(),
            fetcher.clone(),
            media.clone(),
            &SessionConfig::default(),
        );
        let startup = session.start().await;
        Self {
            session,
            host,
            fetcher,
            media,
            startup,
        }
    }

    pub async fn nth(&self, selector: &Selector, n: usize) -> NodeId {
        let doc = self.session.document();
        let doc = doc.read().await;
        doc.select_all(doc.root(), selector)[n]
    }

    pub async fn node(&self, selector: &Selector) -> NodeId {
        self.nth(selector, 0).await
    }

    pub async fn text(&self, selector: &Selector) -> String {
        let node = self.node(selector).await;
        let doc = self.session.document();
        let doc = doc.read().await;
        doc.text_content(node)
    }

    pub async fn attr(&self, selector: &Selector, name: &str) -> Option<String> {
        let node = self.node(selector).await;
        let doc = self.session.document();
        let doc = doc.read().await;
        doc.attr(node, name).map(str::to_string)
    }

    pub async fn has_class(&self, selector: &Selector, class: &str) -> bool {
        let node = self.node(selector).await;
        let doc = self.session.document();
        let doc = doc.read().await;
        doc.has_class(node, class)
    }

    pub async fn title(&self) -> Option<String> {
        let doc = self.session.document();
        let title = doc.read().await.title();
        title
    }

    pub async fn focused(&self) -> Option<NodeId> {
        let doc = self.session.document();
        let focused = doc.read().await.focused();
        focused
    }

    pub async fn transcript_text(&self) -> String {
        self.text(&Selector::class("transcript-body")).await
    }

    pub async fn lyrics_open(&self) -> bool {
        self.attr(&Selector::class("album-lyrics"), "open")
            .await
            .is_some()
    }
}
