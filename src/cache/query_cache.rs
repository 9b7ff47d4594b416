//! Shared query cache with subscriber counting, request coalescing and
//! tag-based invalidation.
//!
//! Every entry publishes its state through a `watch` channel. Fetches run as
//! spawned tasks so an invalidated entry can revalidate in the background
//! while its subscribers keep seeing the previous payload.

use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;

use super::key::QueryKey;
use super::state::{FetchStatus, Payload, QueryState, RawState};
use super::tags::{Tag, TagIndex};
use crate::error::{ApiError, ApiResult};

type ProvidesFn<T> = Arc<dyn Fn(Option<&T>) -> Vec<Tag> + Send + Sync>;
type FetchFuture = Pin<Box<dyn Future<Output = FetchOutcome> + Send>>;
type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

struct FetchOutcome {
    result: Result<Payload, ApiError>,
    tags: HashSet<Tag>,
}

/// Cache-wide settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Grace period for entries whose definition does not set one
    pub keep_unused_for: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::from_secs(60),
        }
    }
}

/// How to key, retain and tag one query.
pub struct QueryDefinition<T> {
    key: QueryKey,
    keep_unused_for: Option<Duration>,
    provides: ProvidesFn<T>,
}

fn no_tags<T>(_: Option<&T>) -> Vec<Tag> {
    Vec::new()
}

impl<T: 'static> QueryDefinition<T> {
    pub fn new<P: Serialize + ?Sized>(endpoint: &'static str, params: &P) -> ApiResult<Self> {
        Ok(Self {
            key: QueryKey::new(endpoint, params)?,
            keep_unused_for: None,
            provides: Arc::new(no_tags::<T>),
        })
    }

    /// How long the entry survives once its last subscriber is gone.
    #[must_use]
    pub fn keep_unused_for(mut self, keep: Duration) -> Self {
        self.keep_unused_for = Some(keep);
        self
    }

    /// Tags the entry provides. Called with the result of every fetch,
    /// `None` when the fetch failed.
    #[must_use]
    pub fn provides<F>(mut self, provides: F) -> Self
    where
        F: Fn(Option<&T>) -> Vec<Tag> + Send + Sync + 'static,
    {
        self.provides = Arc::new(provides);
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

struct CacheEntry {
    state: Arc<watch::Sender<RawState>>,
    generation: u64,
    payload_type: TypeId,
    payload_type_name: &'static str,
    tags: HashSet<Tag>,
    subscribers: usize,
    in_flight: bool,
    stale: bool,
    keep_unused_for: Duration,
    unused_since: Option<Instant>,
    fetcher: Fetcher,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.subscribers == 0
            && !self.in_flight
            && self
                .unused_since
                .is_some_and(|since| now.duration_since(since) >= self.keep_unused_for)
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CacheEntry>,
    tags: TagIndex,
    fetches: u64,
    generations: u64,
}

impl CacheInner {
    fn next_generation(&mut self) -> u64 {
        self.generations += 1;
        self.generations
    }

    /// The entry under `key`, unless it was dropped and recreated since
    /// `generation` was handed out.
    fn entry_mut(&mut self, key: &QueryKey, generation: u64) -> Option<&mut CacheEntry> {
        self.entries
            .get_mut(key)
            .filter(|entry| entry.generation == generation)
    }

    fn evict(&mut self, key: &QueryKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.tags.remove(key, &entry.tags);
                log::debug!("Evicted cache entry {}", key);
                true
            }
            None => false,
        }
    }

    fn evict_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.evict(key);
        }
        expired.len()
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub tags: usize,
    pub fetches: u64,
}

/// Handle to the shared query cache. Cloning is cheap; all clones see the
/// same entries.
#[derive(Clone)]
pub struct QueryCache {
    shared: Arc<Shared>,
}

struct Shared {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        log::debug!(
            "Creating query cache (default grace period {:?})",
            config.keep_unused_for
        );
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(CacheInner::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to a query, creating or joining its cache entry.
    ///
    /// A fetch starts when the entry is new, stale, idle or failed and no
    /// fetch for the key is already in flight; otherwise the subscriber
    /// shares the cached payload or the pending request. Must be called from
    /// within a Tokio runtime.
    pub fn subscribe<T, F, Fut>(
        &self,
        definition: QueryDefinition<T>,
        fetch: F,
    ) -> ApiResult<Subscription<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        if Handle::try_current().is_err() {
            return Err(ApiError::Cache(
                "subscribe requires a running Tokio runtime".to_string(),
            ));
        }

        let QueryDefinition {
            key,
            keep_unused_for,
            provides,
        } = definition;
        let keep_unused_for = keep_unused_for.unwrap_or(self.shared.config.keep_unused_for);
        let fetcher = erase_fetcher(fetch, provides);

        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.evict_expired(Instant::now());

        let (receiver, generation, needs_fetch) = match inner.entries.get_mut(&key) {
            Some(entry) => {
                if entry.payload_type != TypeId::of::<T>() {
                    return Err(ApiError::Cache(format!(
                        "{} holds {}, not {}",
                        key,
                        entry.payload_type_name,
                        type_name::<T>()
                    )));
                }
                entry.subscribers += 1;
                entry.unused_since = None;
                entry.keep_unused_for = keep_unused_for;
                entry.fetcher = fetcher;

                let status = entry.state.borrow().status;
                let needs_fetch = !entry.in_flight
                    && (entry.stale || matches!(status, FetchStatus::Idle | FetchStatus::Error));
                if needs_fetch {
                    log::debug!("Cache entry {} needs refetch (status {:?})", key, status);
                } else {
                    log::debug!("Cache hit for {}", key);
                }
                (entry.state.subscribe(), entry.generation, needs_fetch)
            }
            None => {
                log::debug!("Cache miss for {}", key);
                let (sender, receiver) = watch::channel(RawState::idle());
                let generation = inner.next_generation();
                inner.entries.insert(
                    key.clone(),
                    CacheEntry {
                        state: Arc::new(sender),
                        generation,
                        payload_type: TypeId::of::<T>(),
                        payload_type_name: type_name::<T>(),
                        tags: HashSet::new(),
                        subscribers: 1,
                        in_flight: false,
                        stale: false,
                        keep_unused_for,
                        unused_since: None,
                        fetcher,
                    },
                );
                (receiver, generation, true)
            }
        };

        if needs_fetch {
            self.start_fetch(inner, &key);
        }
        drop(guard);

        Ok(Subscription {
            cache: self.clone(),
            key,
            generation,
            receiver,
            _payload: PhantomData,
        })
    }

    /// Run a side-effecting request; on success mark every entry holding one
    /// of `invalidates` stale. A failed request leaves the cache untouched.
    pub async fn mutate<R, Fut>(
        &self,
        endpoint: &'static str,
        invalidates: &[Tag],
        request: Fut,
    ) -> ApiResult<R>
    where
        Fut: Future<Output = ApiResult<R>>,
    {
        log::debug!("Mutation {} started", endpoint);
        match request.await {
            Ok(result) => {
                let affected = self.invalidate_tags(invalidates);
                log::info!(
                    "Mutation {} succeeded, {} cache entries invalidated",
                    endpoint,
                    affected
                );
                Ok(result)
            }
            Err(e) => {
                log::warn!("Mutation {} failed: {}", endpoint, e);
                Err(e)
            }
        }
    }

    /// Mark every entry tagged with any of `tags` stale. Entries with
    /// subscribers refetch right away and keep serving their last payload;
    /// the rest refetch on their next subscription. Returns the number of
    /// entries marked.
    pub fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let keys = inner.tags.keys_for(tags);

        let mut refetch = Vec::new();
        for key in &keys {
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.stale = true;
                if entry.subscribers > 0 && !entry.in_flight {
                    refetch.push(key.clone());
                }
            }
        }

        if !keys.is_empty() {
            let labels: Vec<String> = tags.iter().map(Tag::to_string).collect();
            log::debug!(
                "Invalidated [{}]: {} stale, {} refetching",
                labels.join(", "),
                keys.len(),
                refetch.len()
            );
        }

        for key in &refetch {
            self.start_fetch(inner, key);
        }
        keys.len()
    }

    /// Explicitly re-issue the query behind `key`.
    pub fn refetch(&self, key: &QueryKey) {
        let generation = self.lock().entries.get(key).map(|entry| entry.generation);
        if let Some(generation) = generation {
            self.refetch_generation(key, generation);
        }
    }

    fn refetch_generation(&self, key: &QueryKey, generation: u64) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let Some(entry) = inner.entry_mut(key, generation) else {
            return;
        };
        entry.stale = true;
        if !entry.in_flight {
            self.start_fetch(inner, key);
        }
    }

    /// Drop entries whose grace period has elapsed. Returns how many went.
    pub fn evict_expired(&self) -> usize {
        self.lock().evict_expired(Instant::now())
    }

    /// Drop every entry (session teardown).
    ///
    /// Subscriptions and fetches from before the call stay attached to the
    /// dropped entries: a fetch still in flight settles only its own
    /// subscribers, and nothing from before reaches an entry created after.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.tags.clear();
        log::info!("Cleared query cache ({} entries)", count);
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscriber count of an entry, `None` if it is not cached.
    pub fn subscriber_count(&self, key: &QueryKey) -> Option<usize> {
        self.lock().entries.get(key).map(|entry| entry.subscribers)
    }

    /// Whether an entry is waiting for a refetch.
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.lock().entries.get(key).map(|entry| entry.stale)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            tags: inner.tags.tag_count(),
            fetches: inner.fetches,
        }
    }

    fn start_fetch(&self, inner: &mut CacheInner, key: &QueryKey) {
        let Some(entry) = inner.entries.get_mut(key) else {
            return;
        };
        if entry.in_flight {
            log::debug!("Coalescing request for {}", key);
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            log::warn!("No Tokio runtime, deferring fetch of {}", key);
            entry.stale = true;
            return;
        };

        entry.in_flight = true;
        entry.stale = false;
        entry
            .state
            .send_modify(|state| state.status = FetchStatus::Loading);
        let request = (entry.fetcher)();
        inner.fetches += 1;

        log::debug!("Fetching {}", key);
        let cache = self.clone();
        let key = key.clone();
        let generation = entry.generation;
        let state = Arc::clone(&entry.state);
        runtime.spawn(async move {
            let outcome = request.await;
            cache.complete_fetch(&key, generation, &state, outcome);
        });
    }

    fn complete_fetch(
        &self,
        key: &QueryKey,
        generation: u64,
        state: &watch::Sender<RawState>,
        outcome: FetchOutcome,
    ) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let FetchOutcome { result, tags } = outcome;
        let current = inner
            .entries
            .get_mut(key)
            .filter(|entry| entry.generation == generation);
        let Some(entry) = current else {
            // Entry was cleared; only its own subscribers still listen here.
            log::debug!("Response for dropped entry {} not cached", key);
            publish(state, key, result);
            return;
        };

        entry.in_flight = false;
        inner.tags.replace(key, &entry.tags, &tags);
        entry.tags = tags;
        publish(state, key, result);

        if entry.subscribers == 0 {
            // Arrived after the last subscriber left; keep it for a full grace period.
            entry.unused_since = Some(Instant::now());
            self.schedule_eviction(key, generation, entry.keep_unused_for);
        }

        let refetch = entry.stale && entry.subscribers > 0;
        if refetch {
            log::debug!("{} was invalidated while in flight, refetching", key);
            self.start_fetch(inner, key);
        }
    }

    fn release(&self, key: &QueryKey, generation: u64) {
        let mut inner = self.lock();
        let Some(entry) = inner.entry_mut(key, generation) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers == 0 {
            entry.unused_since = Some(Instant::now());
            let keep = entry.keep_unused_for;
            log::debug!("Last subscriber left {}, keeping for {:?}", key, keep);
            self.schedule_eviction(key, generation, keep);
        }
    }

    fn schedule_eviction(&self, key: &QueryKey, generation: u64, keep: Duration) {
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        let cache = self.clone();
        let key = key.clone();
        runtime.spawn(async move {
            tokio::time::sleep(keep).await;
            let mut inner = cache.lock();
            let expired = inner
                .entry_mut(&key, generation)
                .is_some_and(|entry| entry.is_expired(Instant::now()));
            if expired {
                inner.evict(&key);
            }
        });
    }
}

fn publish(state: &watch::Sender<RawState>, key: &QueryKey, result: Result<Payload, ApiError>) {
    match result {
        Ok(payload) => {
            state.send_modify(|state| {
                state.data = Some(payload);
                state.error = None;
                state.status = FetchStatus::Success;
            });
        }
        Err(e) => {
            log::warn!("Fetch of {} failed: {}", key, e);
            state.send_modify(|state| {
                state.error = Some(e);
                state.status = FetchStatus::Error;
            });
        }
    }
}

fn erase_fetcher<T, F, Fut>(fetch: F, provides: ProvidesFn<T>) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
{
    Arc::new(move || -> FetchFuture {
        let request = fetch();
        let provides = Arc::clone(&provides);
        Box::pin(async move {
            match request.await {
                Ok(value) => {
                    let tags = provides(Some(&value)).into_iter().collect();
                    FetchOutcome {
                        result: Ok(Arc::new(value) as Payload),
                        tags,
                    }
                }
                Err(e) => FetchOutcome {
                    tags: provides(None).into_iter().collect(),
                    result: Err(e),
                },
            }
        })
    })
}

/// A live interest in one cache entry. Dropping it decrements the entry's
/// subscriber count.
///
/// A subscription is bound to the entry it joined. Once that entry is
/// cleared, the subscription no longer affects whatever replaces it.
pub struct Subscription<T> {
    cache: QueryCache,
    key: QueryKey,
    generation: u64,
    receiver: watch::Receiver<RawState>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state without waiting.
    pub fn state(&self) -> QueryState<T> {
        QueryState::from_raw(&self.receiver.borrow())
    }

    /// Wait for the next state change.
    pub async fn changed(&mut self) -> ApiResult<QueryState<T>> {
        if self.receiver.changed().await.is_err() {
            return Err(self.dropped());
        }
        Ok(self.state())
    }

    /// Wait until the entry is `Success` or `Error`.
    pub async fn settled(&mut self) -> ApiResult<QueryState<T>> {
        let settled = self
            .receiver
            .wait_for(|state| state.status.is_settled())
            .await
            .map(|state| state.clone());
        match settled {
            Ok(raw) => Ok(QueryState::from_raw(&raw)),
            Err(_) => Err(self.dropped()),
        }
    }

    /// Wait for the fetch to settle and return the payload or the error.
    pub async fn data(&mut self) -> ApiResult<Arc<T>> {
        let state = self.settled().await?;
        match (state.status, state.data, state.error) {
            (FetchStatus::Success, Some(data), _) => Ok(data),
            (_, _, Some(e)) => Err(e),
            _ => Err(ApiError::Cache(format!("{} settled without data", self.key))),
        }
    }

    /// User-triggered refresh.
    pub fn refetch(&self) {
        self.cache.refetch_generation(&self.key, self.generation);
    }

    fn dropped(&self) -> ApiError {
        ApiError::Cache(format!("{} was removed from the cache", self.key))
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cache.release(&self.key, self.generation);
    }
}

#[cfg(test)]
#[path = "query_cache_tests.rs"]
mod tests;
