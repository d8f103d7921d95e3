//! Keyed map with in-flight fetch coalescing.
//!
//! The first caller to miss on a key installs a shared future for it; every
//! later caller for the same key awaits a clone of that future instead of
//! starting its own fetch. Whoever observes the result first publishes it to
//! the map and clears the pending slot.

use std::collections::HashMap;
use std::future::Future;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, RwLock};

type SharedFetch<V> = Shared<BoxFuture<'static, V>>;

pub(crate) struct Coalescing<V: Clone> {
    entries: RwLock<HashMap<String, V>>,
    in_flight: Mutex<HashMap<String, SharedFetch<V>>>,
}

impl<V> Coalescing<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()), in_flight: Mutex::new(HashMap::new()) }
    }

    pub(crate) async fn get(&self, key: &str) -> Option<V> {
        self.entries.read().await.get(key).cloned()
    }

    pub(crate) async fn insert(&self, key: String, value: V) {
        self.entries.write().await.insert(key, value);
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub(crate) async fn entries(&self) -> Vec<(String, V)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) async fn is_pending(&self, key: &str) -> bool {
        self.in_flight.lock().await.contains_key(key)
    }

    /// Return the entry for `key` if `is_fresh` accepts it; otherwise run
    /// `populate` once, shared by every concurrent caller for the same key.
    ///
    /// Lock order is always `in_flight` then `entries`.
    pub(crate) async fn get_or_populate<P, F, Fut>(&self, key: &str, is_fresh: P, populate: F) -> V
    where
        P: Fn(&V) -> bool + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = V> + Send + 'static,
    {
        {
            let entries = self.entries.read().await;
            if let Some(value) = entries.get(key)
                && is_fresh(value)
            {
                tracing::debug!("cache hit for {}", key);
                return value.clone();
            }
        }

        let pending = {
            let mut in_flight = self.in_flight.lock().await;

            // A fetch may have been published between the check above and
            // taking the lock.
            let entries = self.entries.read().await;
            if let Some(value) = entries.get(key)
                && is_fresh(value)
            {
                return value.clone();
            }
            drop(entries);

            match in_flight.get(key) {
                Some(pending) => {
                    tracing::debug!("awaiting in-flight fetch for {}", key);
                    pending.clone()
                }
                None => {
                    tracing::debug!("cache miss for {}, fetching", key);
                    let pending = populate().boxed().shared();
                    in_flight.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };

        let value = pending.clone().await;

        let mut in_flight = self.in_flight.lock().await;
        if let Some(current) = in_flight.get(key)
            && current.ptr_eq(&pending)
        {
            self.entries.write().await.insert(key.to_string(), value.clone());
            in_flight.remove(key);
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let map: Arc<Coalescing<u32>> = Arc::new(Coalescing::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = map.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                map.get_or_populate(
                    "k",
                    |_| true,
                    move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        42
                    },
                )
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.get("k").await, Some(42));
        assert!(!map.is_pending("k").await);
    }

    #[tokio::test]
    async fn test_stale_entry_is_replaced() {
        let map: Coalescing<u32> = Coalescing::new();
        map.insert("k".into(), 1).await;

        let fresh = map.get_or_populate("k", |v| *v > 1, || async { 2 }).await;
        assert_eq!(fresh, 2);
        assert_eq!(map.get("k").await, Some(2));

        let cached = map.get_or_populate("k", |v| *v > 1, || async { 3 }).await;
        assert_eq!(cached, 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_independently() {
        let map: Coalescing<&'static str> = Coalescing::new();
        let a = map.get_or_populate("a", |_| true, || async { "A" }).await;
        let b = map.get_or_populate("b", |_| true, || async { "B" }).await;
        assert_eq!((a, b), ("A", "B"));
        assert_eq!(map.len().await, 2);
    }

    #[tokio::test]
    async fn test_abandoned_leader_is_finished_by_follower() {
        let map: Arc<Coalescing<u32>> = Arc::new(Coalescing::new());

        let leader = {
            let map = map.clone();
            tokio::spawn(async move {
                map.get_or_populate(
                    "k",
                    |_| true,
                    || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        7
                    },
                )
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        leader.abort();
        let _ = leader.await;

        let value = map.get_or_populate("k", |_| true, || async { 99 }).await;
        assert_eq!(value, 7);
        assert_eq!(map.get("k").await, Some(7));
    }
}
