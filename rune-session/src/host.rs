//! Platform boundary: location, history, scrolling and the audio element
//!
//! The runtime never touches a browser directly. A host (a wasm shim, a
//! test harness, the headless shell) implements these traits.
//! [`MemoryHost`] and [`DetachedMedia`] are complete headless
//! implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use url::Url;

/// Opaque payload stored with each history position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    /// Resolved absolute URL that produced this position
    pub url: String,
}

impl HistoryState {
    pub fn for_url(url: &Url) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

/// Location, history and viewport operations
pub trait Host: Send + Sync {
    /// Current absolute location
    fn location(&self) -> Url;

    /// Add a history position and make `state.url` the location
    fn push_state(&self, state: HistoryState);

    /// Overwrite the current history position
    fn replace_state(&self, state: HistoryState);

    /// Full (non in-place) navigation to `url`
    fn assign(&self, url: &str);

    fn scroll_to_top(&self);
}

#[derive(Debug)]
struct MemoryHostState {
    entries: Vec<HistoryState>,
    index: usize,
    location: Url,
    assigned: Vec<String>,
    scrolls: usize,
}

/// Headless [`Host`] with a real back/forward stack
#[derive(Debug)]
pub struct MemoryHost {
    inner: Mutex<MemoryHostState>,
}

impl MemoryHost {
    pub fn new(location: Url) -> Self {
        Self {
            inner: Mutex::new(MemoryHostState {
                entries: vec![HistoryState::for_url(&location)],
                index: 0,
                location,
                assigned: Vec::new(),
                scrolls: 0,
            }),
        }
    }

    /// Move one position back, returning the state to deliver as popstate
    pub fn back(&self) -> Option<HistoryState> {
        self.traverse(-1)
    }

    /// Move one position forward, returning the state to deliver as popstate
    pub fn forward(&self) -> Option<HistoryState> {
        self.traverse(1)
    }

    fn traverse(&self, delta: isize) -> Option<HistoryState> {
        let mut inner = self.inner.lock().unwrap();
        let target = inner.index.checked_add_signed(delta)?;
        let state = inner.entries.get(target)?.clone();
        inner.index = target;
        if let Ok(url) = Url::parse(&state.url) {
            inner.location = url;
        }
        Some(state)
    }

    /// History positions, oldest first
    pub fn entries(&self) -> Vec<HistoryState> {
        self.inner.lock().unwrap().entries.clone()
    }

    /// Full navigations requested so far
    pub fn assigned(&self) -> Vec<String> {
        self.inner.lock().unwrap().assigned.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.inner.lock().unwrap().scrolls
    }
}

impl Host for MemoryHost {
    fn location(&self) -> Url {
        self.inner.lock().unwrap().location.clone()
    }

    fn push_state(&self, state: HistoryState) {
        let mut inner = self.inner.lock().unwrap();
        let keep = inner.index + 1;
        inner.entries.truncate(keep);
        if let Ok(url) = Url::parse(&state.url) {
            inner.location = url;
        }
        inner.entries.push(state);
        inner.index = keep;
    }

    fn replace_state(&self, state: HistoryState) {
        let mut inner = self.inner.lock().unwrap();
        if let Ok(url) = Url::parse(&state.url) {
            inner.location = url;
        }
        let index = inner.index;
        inner.entries[index] = state;
    }

    fn assign(&self, url: &str) {
        self.inner.lock().unwrap().assigned.push(url.to_string());
    }

    fn scroll_to_top(&self) {
        self.inner.lock().unwrap().scrolls += 1;
    }
}

/// Media operation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// Platform refused to start playback (e.g. no user gesture)
    #[error("playback blocked: {0}")]
    Blocked(String),

    #[error("seek failed: {0}")]
    Seek(String),
}

/// The widget's single audio element
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    /// Point the element at a new source
    fn load(&self, src: &str);
    fn pause(&self);
    /// Seek to the start
    fn rewind(&self) -> Result<(), MediaError>;
    async fn play(&self) -> Result<(), MediaError>;
}

#[derive(Debug, Default)]
struct DetachedMediaState {
    src: Option<String>,
    paused: bool,
}

/// [`MediaElement`] that tracks state without producing sound
#[derive(Debug)]
pub struct DetachedMedia {
    state: Mutex<DetachedMediaState>,
}

impl Default for DetachedMedia {
    fn default() -> Self {
        Self {
            state: Mutex::new(DetachedMediaState {
                paused: true,
                ..Default::default()
            }),
        }
    }
}

impl DetachedMedia {
    pub fn src(&self) -> Option<String> {
        self.state.lock().unwrap().src.clone()
    }
}

#[async_trait]
impl MediaElement for DetachedMedia {
    fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn ended(&self) -> bool {
        false
    }

    fn load(&self, src: &str) {
        self.state.lock().unwrap().src = Some(src.to_string());
    }

    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn rewind(&self) -> Result<(), MediaError> {
        Ok(())
    }

    async fn play(&self) -> Result<(), MediaError> {
        let mut state = self.state.lock().unwrap();
        if state.src.is_none() {
            return Err(MediaError::Blocked("no source loaded".to_string()));
        }
        state.paused = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://site.test/").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_push_back_forward() {
        let host = MemoryHost::new(url("index.html"));
        host.push_state(HistoryState::for_url(&url("runes.html")));
        host.push_state(HistoryState::for_url(&url("tracks.html")));
        assert_eq!(host.location(), url("tracks.html"));

        let popped = host.back().unwrap();
        assert_eq!(popped.url, url("runes.html").to_string());
        assert_eq!(host.location(), url("runes.html"));

        assert_eq!(host.forward().unwrap().url, url("tracks.html").to_string());
        assert!(host.forward().is_none());
    }

    #[test]
    fn test_push_truncates_forward_entries() {
        let host = MemoryHost::new(url("index.html"));
        host.push_state(HistoryState::for_url(&url("a.html")));
        host.back();
        host.push_state(HistoryState::for_url(&url("b.html")));
        let urls: Vec<String> = host.entries().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec![url("index.html").to_string(), url("b.html").to_string()]);
    }

    #[tokio::test]
    async fn test_detached_media_requires_source() {
        let media = DetachedMedia::default();
        assert!(media.paused());
        assert!(media.play().await.is_err());

        media.load("tracks/a/a.mp3");
        media.play().await.unwrap();
        assert!(!media.paused());
        assert_eq!(media.src().as_deref(), Some("tracks/a/a.mp3"));
    }
}
