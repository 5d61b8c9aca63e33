//! Cache Coordinator: deduplicated, tag-invalidated query results.
//!
//! # Design
//! Each cached query is one `CacheEntry` in a map guarded by a
//! `parking_lot::Mutex`. The lock is never held across an await: fetches
//! run on spawned tasks and report back through `complete`, which swaps the
//! entry's snapshot in a single critical section. Consumers observe the
//! entry through a `tokio::sync::watch` channel, so every subscriber of a
//! key sees the same sequence of snapshots and the same final result.
//!
//! Entries are reference-counted by live `Subscription`s. A fetch is never
//! cancelled by an unsubscribe; an entry whose last subscriber leaves is
//! evicted once no fetch is in flight (after `keep_unused_for`, if set).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::tags::{self, EntityTag};

/// A fetched response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Blob(Bytes),
}

pub type FetchFuture = BoxFuture<'static, Result<Payload, ClientError>>;

/// Produces a fresh fetch of one query each time it is called.
pub type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Identity of a cached query: operation name plus serialized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub operation: &'static str,
    pub args: String,
}

impl QueryKey {
    pub fn new(operation: &'static str, args: impl Into<String>) -> Self {
        Self {
            operation,
            args: args.into(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Fulfilled,
    Failed,
}

/// What a consumer sees of a cached query at one instant.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<Arc<Payload>>,
    pub error: Option<ClientError>,
    pub is_stale: bool,
    pub is_fetching: bool,
}

impl QuerySnapshot {
    fn pending() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            is_stale: false,
            is_fetching: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    /// Settled means no fetch is running and a result (or failure) exists.
    pub fn is_settled(&self) -> bool {
        !self.is_fetching && self.status != QueryStatus::Pending
    }
}

struct CacheEntry {
    epoch: u64,
    provides: Vec<EntityTag>,
    fetcher: Fetcher,
    subscribers: usize,
    /// Bumped each time the entry goes idle; a grace timer only evicts if
    /// no later release superseded it.
    releases: u64,
    fetching: bool,
    refetch_queued: bool,
    snapshot: watch::Sender<QuerySnapshot>,
}

impl CacheEntry {
    fn needs_fetch(&self) -> bool {
        if self.fetching {
            return false;
        }
        let snapshot = self.snapshot.borrow();
        snapshot.status != QueryStatus::Fulfilled || snapshot.is_stale
    }
}

struct CacheInner {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    next_epoch: AtomicU64,
    keep_unused_for: Duration,
}

/// Shared handle to the query cache. Cloning is cheap.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(keep_unused_for: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                next_epoch: AtomicU64::new(1),
                keep_unused_for,
            }),
        }
    }

    /// Subscribe to `key`, starting a fetch only if no fresh result exists
    /// and none is already in flight.
    pub fn subscribe(&self, key: QueryKey, provides: Vec<EntityTag>, fetcher: Fetcher) -> Subscription {
        let mut entries = self.inner.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            let (snapshot, _) = watch::channel(QuerySnapshot::pending());
            CacheEntry {
                epoch: self.inner.next_epoch.fetch_add(1, Ordering::Relaxed),
                provides: Vec::new(),
                fetcher: Arc::clone(&fetcher),
                subscribers: 0,
                releases: 0,
                fetching: false,
                refetch_queued: false,
                snapshot,
            }
        });
        entry.subscribers += 1;
        entry.provides = provides;
        entry.fetcher = fetcher;
        let receiver = entry.snapshot.subscribe();
        let epoch = entry.epoch;

        if entry.needs_fetch() {
            start_fetch(&self.inner, &key, entry, false);
        } else {
            debug!(%key, subscribers = entry.subscribers, "query served from cache");
        }

        Subscription {
            cache: self.clone(),
            key,
            epoch,
            receiver,
        }
    }

    /// Mark every entry providing an invalidated tag stale. Subscribed
    /// entries re-fetch; unsubscribed ones are dropped.
    pub fn invalidate(&self, invalidated: &[EntityTag]) {
        if invalidated.is_empty() {
            return;
        }
        let mut entries = self.inner.entries.lock();
        let mut evict = Vec::new();
        for (key, entry) in entries.iter_mut() {
            if !tags::intersects(&entry.provides, invalidated) {
                continue;
            }
            if entry.fetching {
                // The in-flight response may predate the mutation.
                entry.refetch_queued = true;
                entry.snapshot.send_modify(|s| s.is_stale = true);
            } else if entry.subscribers > 0 {
                start_fetch(&self.inner, key, entry, true);
            } else {
                evict.push(key.clone());
            }
        }
        for key in evict {
            debug!(%key, "evicting unsubscribed invalidated query");
            entries.remove(&key);
        }
    }

    /// Force a re-fetch of `key` if it is cached.
    pub fn refetch(&self, key: &QueryKey) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.fetching {
            entry.refetch_queued = true;
        } else {
            start_fetch(&self.inner, key, entry, false);
        }
    }

    /// Drop every entry. Pending subscribers observe `ClientError::Evicted`.
    pub fn clear(&self) {
        let mut entries = self.inner.entries.lock();
        debug!(entries = entries.len(), "clearing query cache");
        entries.clear();
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let entries = self.inner.entries.lock();
        entries.get(key).map(|entry| entry.snapshot.borrow().clone())
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        let entries = self.inner.entries.lock();
        entries.get(key).map_or(0, |entry| entry.subscribers)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &QueryKey, epoch: u64) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if entry.epoch != epoch {
            return;
        }
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers == 0 && !entry.fetching {
            retire(&self.inner, &mut entries, key);
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

fn start_fetch(inner: &Arc<CacheInner>, key: &QueryKey, entry: &mut CacheEntry, mark_stale: bool) {
    entry.fetching = true;
    entry.refetch_queued = false;
    entry.snapshot.send_modify(|s| {
        s.is_fetching = true;
        s.is_stale |= mark_stale;
    });
    debug!(%key, stale = mark_stale, "fetching query");

    let future = (entry.fetcher)();
    let inner = Arc::clone(inner);
    let key = key.clone();
    let epoch = entry.epoch;
    tokio::spawn(async move {
        let result = future.await;
        complete(&inner, &key, epoch, result);
    });
}

fn complete(inner: &Arc<CacheInner>, key: &QueryKey, epoch: u64, result: Result<Payload, ClientError>) {
    let mut entries = inner.entries.lock();
    let Some(entry) = entries.get_mut(key) else {
        debug!(%key, "discarding result for evicted query");
        return;
    };
    if entry.epoch != epoch {
        return;
    }
    entry.fetching = false;

    if entry.refetch_queued {
        if entry.subscribers > 0 {
            start_fetch(inner, key, entry, true);
        } else {
            entries.remove(key);
        }
        return;
    }

    let previous = entry.snapshot.borrow().data.clone();
    let next = match result {
        Ok(payload) => QuerySnapshot {
            status: QueryStatus::Fulfilled,
            data: Some(Arc::new(payload)),
            error: None,
            is_stale: false,
            is_fetching: false,
        },
        Err(err) => match previous {
            Some(data) => {
                warn!(%key, error = %err, "refetch failed, keeping stale data");
                QuerySnapshot {
                    status: QueryStatus::Failed,
                    data: Some(data),
                    error: Some(ClientError::CacheConsistency(Box::new(err))),
                    is_stale: true,
                    is_fetching: false,
                }
            }
            None => {
                debug!(%key, error = %err, "query failed");
                QuerySnapshot {
                    status: QueryStatus::Failed,
                    data: None,
                    error: Some(err),
                    is_stale: false,
                    is_fetching: false,
                }
            }
        },
    };
    entry.snapshot.send_replace(next);

    if entry.subscribers == 0 {
        retire(inner, &mut entries, key);
    }
}

/// Evict an unsubscribed, idle entry now or after the keep-unused grace.
fn retire(inner: &Arc<CacheInner>, entries: &mut HashMap<QueryKey, CacheEntry>, key: &QueryKey) {
    let keep = inner.keep_unused_for;
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) if !keep.is_zero() => handle,
        _ => {
            debug!(%key, "evicting unsubscribed query");
            entries.remove(key);
            return;
        }
    };
    let Some((epoch, release)) = entries.get_mut(key).map(|entry| {
        entry.releases += 1;
        (entry.epoch, entry.releases)
    }) else {
        return;
    };
    let inner = Arc::clone(inner);
    let key = key.clone();
    handle.spawn(async move {
        tokio::time::sleep(keep).await;
        let mut entries = inner.entries.lock();
        let unused = entries
            .get(&key)
            .is_some_and(|entry| {
                entry.epoch == epoch && entry.releases == release && entry.subscribers == 0 && !entry.fetching
            });
        if unused {
            debug!(%key, "evicting query after keep-unused period");
            entries.remove(&key);
        }
    });
}

/// A live interest in one cached query. Dropping it releases the reference.
pub struct Subscription {
    cache: QueryCache,
    key: QueryKey,
    epoch: u64,
    receiver: watch::Receiver<QuerySnapshot>,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait until no fetch is running and a result exists, then return it.
    pub async fn settled(&mut self) -> Result<Arc<Payload>, ClientError> {
        let snapshot = self
            .receiver
            .wait_for(QuerySnapshot::is_settled)
            .await
            .map_err(|_| ClientError::Evicted)?
            .clone();
        match (snapshot.status, snapshot.data, snapshot.error) {
            (QueryStatus::Fulfilled, Some(data), _) => Ok(data),
            (_, _, Some(err)) => Err(err),
            _ => Err(ClientError::Evicted),
        }
    }

    /// Wait for the next snapshot change.
    pub async fn changed(&mut self) -> Result<QuerySnapshot, ClientError> {
        self.receiver.changed().await.map_err(|_| ClientError::Evicted)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    pub fn refetch(&self) {
        self.cache.refetch(&self.key);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.release(&self.key, self.epoch);
    }
}
