//! rune-shell - headless driver for a rune site session
//!
//! Fetches a start page, runs session startup against it, then replays
//! in-place navigations, an optional history-back motion and an optional
//! lyrics load, printing one summary line per step.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rune_common::{SessionConfig, SiteEvent};
use rune_session::{
    DetachedMedia, DomEvent, Host, MemoryHost, NavigationKind, NavigationOutcome, Selector, Session,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for rune-shell
#[derive(Parser, Debug)]
#[command(name = "rune-shell")]
#[command(about = "Headless rune site session driver")]
#[command(version)]
struct Args {
    /// Start page URL
    #[arg(short, long, env = "RUNE_URL")]
    url: String,

    /// Path to session config file (overrides RUNE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Navigate in place to this href (repeatable, applied in order)
    #[arg(long)]
    visit: Vec<String>,

    /// Go back one history position after the visits
    #[arg(long)]
    back: bool,

    /// Open the lyrics disclosure at the end and print the transcript
    #[arg(long)]
    lyrics: bool,

    /// Print session events as JSON lines
    #[arg(long)]
    events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can seed the filter
    let config =
        SessionConfig::load(args.config.as_deref()).context("Failed to load session config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rune_session={level},rune_shell={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting rune-shell v{}", env!("CARGO_PKG_VERSION"));

    let (session, host) = Session::connect(&args.url, &config, Arc::new(DetachedMedia::default()))
        .await
        .with_context(|| format!("Failed to open start page {}", args.url))?;
    let mut events = args.events.then(|| session.events().subscribe());

    let report = session.start().await;
    info!(
        "Includes: {} loaded, {} failed",
        report.includes.loaded, report.includes.failed
    );
    print_step("start", &session, &host, None).await;
    drain_events(&mut events);

    for href in &args.visit {
        let outcome = session.navigation().load(href, NavigationKind::Push).await;
        print_step(&format!("visit {}", href), &session, &host, Some(&outcome)).await;
        drain_events(&mut events);
    }

    if args.back {
        match host.back() {
            Some(state) => {
                let dispatch = session.dispatch(DomEvent::PopState { state: Some(state) }).await;
                print_step("back", &session, &host, dispatch.navigation.as_ref()).await;
            }
            None => warn!("No earlier history position to go back to"),
        }
        drain_events(&mut events);
    }

    if args.lyrics {
        match session.player().await {
            Some(player) => {
                let outcome = player.disclosure_toggled(true).await;
                let doc = session.document();
                let doc = doc.read().await;
                let text = doc
                    .select_first(doc.root(), &Selector::class("transcript-body"))
                    .map(|body| doc.text_content(body))
                    .unwrap_or_default();
                println!(
                    "lyrics [{}]",
                    outcome.map(|o| o.to_string()).unwrap_or_else(|| "unchanged".to_string())
                );
                println!("{}", text);
            }
            None => warn!("Page has no album player"),
        }
        drain_events(&mut events);
    }

    Ok(())
}

async fn print_step(
    step: &str,
    session: &Session,
    host: &MemoryHost,
    outcome: Option<&NavigationOutcome>,
) {
    let (title, page_id) = {
        let doc = session.document();
        let doc = doc.read().await;
        (
            doc.title().unwrap_or_default(),
            rune_session::navigation::page_id(&doc),
        )
    };
    let (mode, track) = match session.player().await {
        Some(player) => (
            player.mode().await.to_string(),
            player.active_track().map(|t| t.title).unwrap_or_default(),
        ),
        None => ("absent".to_string(), String::new()),
    };
    let result = match outcome {
        Some(NavigationOutcome::Completed { .. }) => "in-place".to_string(),
        Some(NavigationOutcome::FellBack { url, reason }) => {
            format!("full navigation to {} ({})", url, reason)
        }
        Some(NavigationOutcome::Dropped) => "dropped".to_string(),
        None => "-".to_string(),
    };
    println!(
        "{:<16} url={} title={:?} page={:?} player={} track={:?} result={}",
        step,
        host.location(),
        title,
        page_id,
        mode,
        track,
        result
    );
}

fn drain_events(events: &mut Option<broadcast::Receiver<SiteEvent>>) {
    let Some(rx) = events else {
        return;
    };
    while let Ok(event) = rx.try_recv() {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Could not serialize {} event: {}", event.event_type(), e),
        }
    }
}
