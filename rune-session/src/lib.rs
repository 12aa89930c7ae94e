//! # Rune Session
//!
//! Client runtime for the rune site. One [`Session`] keeps a long-lived
//! page coherent across in-place navigations:
//! - [`fragments`] fills shared chrome placeholders at startup
//! - [`hydrate`] turns presentation-only text into real text
//! - [`player`] drives the persistent album player widget
//! - [`navigation`] splices fetched pages into the live document
//!
//! The browser is abstracted behind [`host::Host`], [`host::MediaElement`]
//! and [`fetch::Fetcher`]; the document itself is an in-memory tree
//! ([`dom::Document`]).

pub mod dom;
pub mod error;
pub mod fetch;
pub mod fragments;
pub mod host;
pub mod hydrate;
pub mod navigation;
pub mod player;
pub mod session;

use std::sync::Arc;
use tokio::sync::RwLock;

pub use dom::{Document, NodeId, Selector};
pub use error::{Error, Result};
pub use fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use host::{DetachedMedia, HistoryState, Host, MediaElement, MediaError, MemoryHost};
pub use hydrate::Hydrator;
pub use navigation::{NavigationController, NavigationError, NavigationKind, NavigationOutcome};
pub use player::{PlayerController, SelectOptions, TranscriptState};
pub use session::{Dispatch, DomEvent, Session, StartupReport};

/// The live document, shared by every component of a session
pub type SharedDocument = Arc<RwLock<Document>>;
