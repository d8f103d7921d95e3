//! In-memory [`Fetcher`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::fetch::Fetcher;

/// Serves canned bodies by exact URL and records every request.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    bodies: HashMap<String, Bytes>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Requests made for `url`.
    pub(crate) fn count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Requests made for any URL ending in `suffix`.
    pub(crate) fn count_suffix(&self, suffix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.ends_with(suffix)).count()
    }

    pub(crate) fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch_bytes(&self, url: &str) -> Option<Bytes> {
        self.calls.lock().unwrap().push(url.to_string());
        self.bodies.get(url).cloned()
    }
}
