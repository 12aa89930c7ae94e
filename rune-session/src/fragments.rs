//! Fragment Loader
//!
//! Fills `[data-include]` placeholders with shared page chrome at
//! startup. Each include URL is fetched at most once per document
//! lifetime: concurrent placeholders naming the same URL share one
//! pending request through [`FragmentCache`].

use crate::dom::{Document, NodeId, Selector};
use crate::fetch::{FetchError, FetchRequest, Fetcher};
use crate::SharedDocument;
use futures::future::{BoxFuture, FutureExt, Shared};
use rune_common::events::{EventBus, SiteEvent};
use rune_common::Labels;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

type PendingFragment = Shared<BoxFuture<'static, Result<Arc<str>, FetchError>>>;

/// URL-keyed store of in-flight or resolved fragment bodies
#[derive(Default)]
pub struct FragmentCache {
    entries: Mutex<HashMap<String, PendingFragment>>,
}

impl FragmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `url` unless a request for it already exists, then await it
    pub async fn load(
        &self,
        url: &Url,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Arc<str>, FetchError> {
        let pending = {
            let mut entries = self.entries.lock().unwrap();
            entries
                .entry(url.to_string())
                .or_insert_with(|| {
                    let request = FetchRequest::get(url.clone());
                    async move { fetcher.get_text(request).await.map(Arc::from) }
                        .boxed()
                        .shared()
                })
                .clone()
        };
        pending.await
    }

    /// Number of distinct URLs requested so far
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Outcome of one startup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncludeSummary {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
}

pub struct FragmentLoader {
    cache: Arc<FragmentCache>,
    fetcher: Arc<dyn Fetcher>,
    events: EventBus,
    failure_text: String,
    ready: watch::Sender<bool>,
}

impl FragmentLoader {
    pub fn new(
        cache: Arc<FragmentCache>,
        fetcher: Arc<dyn Fetcher>,
        events: EventBus,
        labels: &Labels,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            cache,
            fetcher,
            events,
            failure_text: labels.include_failed.clone(),
            ready,
        }
    }

    /// Process every placeholder in the document concurrently
    ///
    /// Resolves once all of them have either been filled or replaced by
    /// the failure notice, then publishes includes-ready.
    pub async fn load_all(&self, doc: &SharedDocument, base: &Url) -> IncludeSummary {
        let placeholders: Vec<(NodeId, String)> = {
            let doc = doc.read().await;
            doc.select_all(doc.root(), &Selector::attr("data-include"))
                .into_iter()
                .filter_map(|id| {
                    let url = doc.attr(id, "data-include")?.trim();
                    (!url.is_empty()).then(|| (id, url.to_string()))
                })
                .collect()
        };

        let results = futures::future::join_all(
            placeholders
                .iter()
                .map(|(node, href)| self.apply_include(doc, *node, href, base)),
        )
        .await;

        let failed = results.iter().filter(|ok| !**ok).count();
        let summary = IncludeSummary {
            total: results.len(),
            loaded: results.len() - failed,
            failed,
        };
        info!(
            "Includes settled: {} loaded, {} failed ({} distinct URLs)",
            summary.loaded,
            summary.failed,
            self.cache.len()
        );

        self.ready.send_replace(true);
        self.events.emit_lossy(SiteEvent::IncludesLoaded {
            total: summary.total,
            failed: summary.failed,
            timestamp: rune_common::time::now(),
        });
        summary
    }

    /// Resolve once the first [`load_all`](Self::load_all) has settled
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    async fn apply_include(
        &self,
        doc: &SharedDocument,
        node: NodeId,
        href: &str,
        base: &Url,
    ) -> bool {
        let body = match base.join(href) {
            Ok(url) => self.cache.load(&url, self.fetcher.clone()).await,
            Err(e) => Err(FetchError::Network(format!("bad include URL {}: {}", href, e))),
        };

        let mut doc = doc.write().await;
        if !doc.is_connected(node) {
            debug!("Placeholder for {} left the document before its include arrived", href);
            return body.is_ok();
        }
        match body {
            Ok(html) => {
                fill_placeholder(&mut doc, node, &html);
                debug!("Included {}", href);
                true
            }
            Err(e) => {
                warn!("Failed to load include {}: {}", href, e);
                render_failure(&mut doc, node, &self.failure_text);
                false
            }
        }
    }
}

fn fill_placeholder(doc: &mut Document, node: NodeId, html: &str) {
    doc.set_inner_html(node, html);

    if let Some(title) = doc.attr(node, "data-sr-title").map(str::to_string) {
        if !title.is_empty() {
            if let Some(slot) = doc.select_first(node, &Selector::attr_eq("data-slot", "sr-title")) {
                doc.set_text_content(slot, &title);
            }
        }
    }

    if let Some(current) = doc.attr(node, "data-nav-current").map(str::to_string) {
        if !current.is_empty() {
            if let Some(link) = doc.select_first(node, &Selector::attr_eq("data-nav", &current)) {
                doc.set_attr(link, "aria-current", "page");
            }
        }
    }
}

fn render_failure(doc: &mut Document, node: NodeId, text: &str) {
    doc.clear_children(node);
    let notice = doc.create_element("div");
    doc.set_attr(notice, "role", "status");
    doc.set_text_content(notice, text);
    doc.append_child(node, notice);
}
