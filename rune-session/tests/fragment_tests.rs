//! Startup fragment includes

mod helpers;

use helpers::{pages, Harness, RecordingMedia, ScriptedFetcher};
use rune_common::{SessionConfig, SiteEvent};
use rune_session::fragments::IncludeSummary;
use rune_session::{Document, MemoryHost, Selector, Session};
use std::sync::Arc;

const HEADER: &str = r#"<span class="sr-only" data-slot="sr-title"></span>
<a data-nav="runes" href="runes.html">runes</a>
<a data-nav="tracks" href="tracks.html">tracks</a>"#;

const FOOTER: &str = r#"<p class="footnote">&copy; <span data-now-year></span></p>"#;

const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>home</title></head>
<body data-page="index">
  <header id="top" data-include="partials/header.html" data-sr-title="rune home" data-nav-current="runes"></header>
  <main><p>hello</p></main>
  <aside id="side" data-include="partials/header.html"></aside>
  <footer id="bottom" data-include="partials/footer.html"></footer>
  <div id="broken" data-include="partials/missing.html"><p>stale</p></div>
</body></html>"#;

fn fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .route("partials/header.html", HEADER)
        .route("partials/footer.html", FOOTER)
}

#[tokio::test]
async fn test_shared_include_fetched_once() {
    let h = Harness::start("index.html", PAGE, fetcher()).await;

    assert_eq!(h.fetcher.hits("partials/header.html"), 1);
    assert_eq!(h.fetcher.hits("partials/footer.html"), 1);

    let doc = h.session.document();
    let doc = doc.read().await;
    for id in ["top", "side"] {
        let node = doc
            .select_first(doc.root(), &Selector::attr_eq("id", id))
            .unwrap();
        assert_eq!(
            doc.select_all(node, &Selector::attr("data-nav")).len(),
            2,
            "{} should hold the header",
            id
        );
    }
}

#[tokio::test]
async fn test_include_post_processing() {
    let h = Harness::start("index.html", PAGE, fetcher()).await;

    let doc = h.session.document();
    let doc = doc.read().await;
    let top = doc
        .select_first(doc.root(), &Selector::attr_eq("id", "top"))
        .unwrap();
    let side = doc
        .select_first(doc.root(), &Selector::attr_eq("id", "side"))
        .unwrap();

    let slot = doc
        .select_first(top, &Selector::attr_eq("data-slot", "sr-title"))
        .unwrap();
    assert_eq!(doc.text_content(slot), "rune home");

    let current = Selector::attr_eq("data-nav", "runes");
    let top_link = doc.select_first(top, &current).unwrap();
    assert_eq!(doc.attr(top_link, "aria-current"), Some("page"));
    let other = doc
        .select_first(top, &Selector::attr_eq("data-nav", "tracks"))
        .unwrap();
    assert!(!doc.has_attr(other, "aria-current"));

    // the second copy declares neither option
    let side_link = doc.select_first(side, &current).unwrap();
    assert!(!doc.has_attr(side_link, "aria-current"));
    let side_slot = doc
        .select_first(side, &Selector::attr_eq("data-slot", "sr-title"))
        .unwrap();
    assert_eq!(doc.text_content(side_slot), "");
}

#[tokio::test]
async fn test_failed_include_renders_notice() {
    let h = Harness::start("index.html", PAGE, fetcher()).await;

    assert_eq!(
        h.startup.includes,
        IncludeSummary {
            total: 4,
            loaded: 3,
            failed: 1,
        }
    );

    let doc = h.session.document();
    let doc = doc.read().await;
    let broken = doc
        .select_first(doc.root(), &Selector::attr_eq("id", "broken"))
        .unwrap();
    let children = doc.children(broken);
    assert_eq!(children.len(), 1);
    assert_eq!(doc.tag_name(children[0]), Some("div"));
    assert_eq!(doc.attr(children[0], "role"), Some("status"));
    assert_eq!(doc.text_content(broken), "Failed to load component.");
}

#[tokio::test]
async fn test_network_failure_does_not_block_other_includes() {
    let fetcher = fetcher().network_error("partials/header.html");
    let h = Harness::start("index.html", PAGE, fetcher).await;

    assert_eq!(h.startup.includes.failed, 3);
    assert_eq!(
        h.text(&Selector::class("footnote")).await,
        format!("© {}", rune_common::time::current_year())
    );
}

#[tokio::test]
async fn test_includes_ready_signal() {
    let session = Session::new(
        Document::parse(PAGE),
        Arc::new(MemoryHost::new(pages::url("index.html"))),
        Arc::new(fetcher()),
        Arc::new(RecordingMedia::new()),
        &SessionConfig::default(),
    );
    let mut events = session.events().subscribe();
    assert!(!session.fragments().is_ready());

    let ((), report) = tokio::join!(session.fragments().wait_ready(), session.start());

    assert!(session.fragments().is_ready());
    assert_eq!(report.includes.total, 4);
    match events.try_recv().unwrap() {
        SiteEvent::IncludesLoaded { total, failed, .. } => {
            assert_eq!(total, 4);
            assert_eq!(failed, 1);
        }
        other => panic!("unexpected event {}", other.event_type()),
    }
}
