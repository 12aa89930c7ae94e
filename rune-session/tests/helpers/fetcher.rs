//! Scripted Fetcher double

use async_trait::async_trait;
use rune_session::{FetchError, FetchRequest, FetchResponse, Fetcher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
enum Route {
    Body(String),
    Status(u16),
    Network,
}

/// Fetcher answering from a URL -> response table
///
/// Unrouted URLs answer 404. A gated URL holds its response until the
/// gate is notified.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<FetchRequest>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, path: &str, body: &str) -> Self {
        self.set(path, Route::Body(body.to_string()));
        self
    }

    pub fn status(self, path: &str, status: u16) -> Self {
        self.set(path, Route::Status(status));
        self
    }

    pub fn network_error(self, path: &str) -> Self {
        self.set(path, Route::Network);
        self
    }

    fn set(&self, path: &str, route: Route) {
        self.routes
            .lock()
            .unwrap()
            .insert(super::pages::url(path).to_string(), route);
    }

    /// Hold responses for `path` until the returned gate is notified
    pub fn gate(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(super::pages::url(path).to_string(), gate.clone());
        gate
    }

    pub fn hits(&self, path: &str) -> usize {
        let key = super::pages::url(path).to_string();
        self.hits.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let key = request.url.to_string();
        *self.hits.lock().unwrap().entry(key.clone()).or_default() += 1;
        self.requests.lock().unwrap().push(request);

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let route = self.routes.lock().unwrap().get(&key).cloned();
        match route {
            Some(Route::Body(body)) => Ok(FetchResponse { status: 200, body }),
            Some(Route::Status(status)) => Ok(FetchResponse {
                status,
                body: String::new(),
            }),
            Some(Route::Network) => Err(FetchError::Network("connection reset".to_string())),
            None => Ok(FetchResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}
