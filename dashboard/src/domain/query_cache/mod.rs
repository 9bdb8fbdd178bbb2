//! Query cache and fetch scheduler.
//!
//! The cache is the single point of mutation mapping each [`QueryKey`] to one
//! entry. It keeps at most one gateway call in flight per key, serves settled
//! values while they are fresh, revalidates stale values in the background
//! without hiding them, retries retryable failures behind a stable Pending
//! state, and discards settlements from fetches that have been superseded.
//!
//! Entries are reference counted by their [`Subscription`]s and evicted once
//! they have been idle for the retention window.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::ports::{DataGateway, GatewayError};
use crate::domain::query_key::QueryKey;

mod entry;
mod options;
mod subscription;

use entry::{CacheEntry, FetchTrigger};
pub use options::FetchOptions;
pub use subscription::{FetchResult, Observation, Subscription};

/// Default time an unsubscribed entry is kept for reuse.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

/// Type-erased rows stored in an entry.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

pub(crate) type ErasedFetcher =
    Arc<dyn Fn(FetchContext) -> BoxFuture<'static, Result<Payload, GatewayError>> + Send + Sync>;

/// Inputs handed to a fetch function for one gateway call.
#[derive(Clone)]
pub struct FetchContext {
    /// Gateway selected at startup.
    pub gateway: Arc<dyn DataGateway>,
    /// Instant the call was issued, for time-windowed requests.
    pub issued_at: DateTime<Utc>,
}

/// Async sleeping abstraction used between retries.
#[async_trait]
pub trait FetchSleeper: Send + Sync {
    /// Suspend the retrying fetch for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl FetchSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

struct FetchJob {
    key: QueryKey,
    generation: u64,
    fetcher: ErasedFetcher,
    options: FetchOptions,
}

pub(crate) struct CacheInner {
    gateway: Arc<dyn DataGateway>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn FetchSleeper>,
    retention: Duration,
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    generations: AtomicU64,
}

/// Shared handle to the cache. Clones address the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    /// Build a cache over `gateway` that sleeps with Tokio between retries.
    pub fn new(gateway: Arc<dyn DataGateway>, clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self::with_sleeper(gateway, clock, Arc::new(TokioSleeper), retention)
    }

    /// Build a cache with an injected retry sleeper.
    pub fn with_sleeper(
        gateway: Arc<dyn DataGateway>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn FetchSleeper>,
        retention: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                gateway,
                clock,
                sleeper,
                retention,
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Register interest in `key` and start a fetch when the entry needs one.
    ///
    /// A fetch starts when nothing has been attempted yet, when no value has
    /// ever settled (so a failed key is retried for a new subscriber), or
    /// when the settled value is older than `options.stale_time`. A fetch
    /// already in flight is shared rather than repeated.
    ///
    /// # Panics
    ///
    /// Spawns the fetch on the current Tokio runtime, so it panics when
    /// called outside one.
    ///
    /// ```rust,ignore
    /// let subscription = cache.subscribe(
    ///     QueryKey::new("drafts"),
    ///     |context| async move { fetch_rows::<Draft>(context.gateway.as_ref(), &request).await },
    ///     FetchOptions::default(),
    /// );
    /// let observation = subscription.observe();
    /// ```
    pub fn subscribe<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        options: FetchOptions,
    ) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn(FetchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, GatewayError>> + Send + 'static,
    {
        let fetcher: ErasedFetcher = Arc::new(move |context: FetchContext| {
            fetch(context)
                .map(|outcome| outcome.map(|rows| Arc::new(rows) as Payload))
                .boxed()
        });
        let now = self.inner.clock.utc();

        let (receiver, job) = {
            let mut entries = self.inner.lock_entries();
            self.inner.evict_expired(&mut entries, now);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(Arc::clone(&fetcher), options));
            entry.subscribers += 1;
            entry.idle_since = None;
            entry.fetcher = fetcher;
            entry.options = options;

            let job = if entry.wants_fetch(FetchTrigger::Mount, now) {
                Some(self.inner.begin_fetch(&key, entry))
            } else {
                debug!(%key, in_flight = entry.in_flight.is_some(), "serving cached entry");
                None
            };
            (entry.state.subscribe(), job)
        };

        if let Some(job) = job {
            self.inner.spawn(job);
        }
        Subscription::new(key, receiver, Arc::clone(&self.inner))
    }

    /// Re-evaluate an existing subscription on re-render.
    ///
    /// Starts a background fetch only when none is in flight and the last
    /// attempt settled more than `stale_time` ago, so repeated renders with
    /// no state change never reach the gateway. Returns whether a fetch
    /// started.
    pub fn revalidate<T: Send + Sync + 'static>(&self, subscription: &Subscription<T>) -> bool {
        self.trigger(subscription.key(), FetchTrigger::Render)
    }

    /// Fetch `key` again regardless of freshness.
    ///
    /// A fetch already in flight for the key is superseded: its settlement is
    /// discarded when it arrives. Returns `false` when the key has no entry.
    pub fn refetch(&self, key: &QueryKey) -> bool {
        self.trigger(key, FetchTrigger::Manual)
    }

    /// Refetch every subscribed, stale entry that opted into focus refetches.
    /// Returns the number of fetches started.
    pub fn focus_regained(&self) -> usize {
        let now = self.inner.clock.utc();
        let jobs: Vec<FetchJob> = {
            let mut entries = self.inner.lock_entries();
            entries
                .iter_mut()
                .filter(|(_, entry)| entry.wants_fetch(FetchTrigger::FocusRegained, now))
                .map(|(key, entry)| self.inner.begin_fetch(key, entry))
                .collect()
        };
        let started = jobs.len();
        for job in jobs {
            self.inner.spawn(job);
        }
        started
    }

    /// Drop entries idle for longer than the retention window.
    /// Returns the number of entries removed.
    pub fn collect_garbage(&self) -> usize {
        let now = self.inner.clock.utc();
        let mut entries = self.inner.lock_entries();
        self.inner.evict_expired(&mut entries, now)
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> usize {
        self.inner.lock_entries().len()
    }

    /// Number of subscriptions currently holding `key`.
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner
            .lock_entries()
            .get(key)
            .map_or(0, |entry| entry.subscribers)
    }

    fn trigger(&self, key: &QueryKey, trigger: FetchTrigger) -> bool {
        let now = self.inner.clock.utc();
        let job = {
            let mut entries = self.inner.lock_entries();
            let Some(entry) = entries.get_mut(key) else {
                return false;
            };
            if !entry.wants_fetch(trigger, now) {
                return false;
            }
            self.inner.begin_fetch(key, entry)
        };
        self.inner.spawn(job);
        true
    }
}

impl CacheInner {
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_fetch(&self, key: &QueryKey, entry: &mut CacheEntry) -> FetchJob {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(previous) = entry.in_flight.replace(generation) {
            debug!(%key, previous, generation, "superseding in-flight fetch");
        } else {
            debug!(%key, generation, "starting fetch");
        }
        entry.state.send_modify(|state| state.fetching = true);
        FetchJob {
            key: key.clone(),
            generation,
            fetcher: Arc::clone(&entry.fetcher),
            options: entry.options,
        }
    }

    fn spawn(self: &Arc<Self>, job: FetchJob) {
        tokio::spawn(Arc::clone(self).run_fetch(job));
    }

    async fn run_fetch(self: Arc<Self>, job: FetchJob) {
        let FetchJob {
            key,
            generation,
            fetcher,
            options,
        } = job;
        let max_attempts = options.max_attempts();

        let mut attempt = 1;
        let (outcome, issued_at) = loop {
            let started = self.clock.utc();
            let context = FetchContext {
                gateway: Arc::clone(&self.gateway),
                issued_at: started,
            };
            match (*fetcher)(context).await {
                Ok(payload) => break (Ok(payload), started),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    if !self.is_current(&key, generation) {
                        debug!(%key, generation, "abandoning retries for superseded fetch");
                        return;
                    }
                    let delay = options.retry_delay(attempt);
                    warn!(%key, attempt, ?delay, %error, "fetch failed; retrying");
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => break (Err(error), started),
            }
        };
        self.settle(&key, generation, outcome, issued_at);
    }

    fn is_current(&self, key: &QueryKey, generation: u64) -> bool {
        self.lock_entries()
            .get(key)
            .is_some_and(|entry| entry.in_flight == Some(generation))
    }

    fn settle(
        &self,
        key: &QueryKey,
        generation: u64,
        outcome: Result<Payload, GatewayError>,
        issued_at: DateTime<Utc>,
    ) {
        let now = self.clock.utc();
        let mut entries = self.lock_entries();
        let Some(entry) = entries.get_mut(key) else {
            debug!(%key, generation, "discarding settlement for evicted entry");
            return;
        };
        if entry.in_flight != Some(generation) {
            debug!(%key, generation, "discarding settlement from superseded fetch");
            return;
        }
        entry.in_flight = None;

        entry.state.send_modify(|state| {
            state.fetching = false;
            state.attempted_at = Some(now);
            match outcome {
                Ok(payload) => {
                    state.value = Some(payload);
                    state.error = None;
                    state.settled_at = Some(now);
                    state.issued_at = Some(issued_at);
                }
                Err(error) => {
                    if state.value.is_some() {
                        warn!(%key, %error, "background refresh failed; keeping previous value");
                    } else {
                        debug!(%key, %error, "fetch failed");
                    }
                    state.error = Some(error);
                }
            }
        });
    }

    fn release(&self, key: &QueryKey) {
        let now = self.clock.utc();
        let mut entries = self.lock_entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.idle_since = Some(now);
            }
        }
    }

    fn evict_expired(&self, entries: &mut HashMap<QueryKey, CacheEntry>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|key, entry| {
            let expired = entry.is_expired(now, self.retention);
            if expired {
                debug!(%key, "evicting idle cache entry");
            }
            !expired
        });
        before - entries.len()
    }
}
