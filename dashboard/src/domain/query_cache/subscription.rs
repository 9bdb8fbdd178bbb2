//! Subscriber handles and the typed view of an entry's state.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::CacheInner;
use super::entry::EntryState;
use crate::domain::ports::GatewayError;
use crate::domain::query_key::QueryKey;

/// Three-state result of a cached request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
    /// No value has settled yet.
    Pending,
    /// Rows in gateway order.
    Ok(Arc<Vec<T>>),
    /// Terminal failure with no value to fall back to.
    Error(GatewayError),
}

/// Snapshot of one entry as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<T> {
    /// Primary result.
    pub result: FetchResult<T>,
    /// Failure of a background refetch while an older value stays visible.
    pub refresh_error: Option<GatewayError>,
    /// Whether a fetch is currently in flight.
    pub is_fetching: bool,
    /// Instant the visible value settled.
    pub settled_at: Option<DateTime<Utc>>,
    /// Instant the request behind the visible value was issued.
    pub issued_at: Option<DateTime<Utc>>,
}

impl<T: Send + Sync + 'static> Observation<T> {
    fn from_state(state: &EntryState, key: &QueryKey) -> Self {
        let (result, refresh_error) = match &state.value {
            Some(payload) => match Arc::clone(payload).downcast::<Vec<T>>() {
                Ok(rows) => (FetchResult::Ok(rows), state.error.clone()),
                Err(_) => (
                    FetchResult::Error(GatewayError::decode(format!(
                        "cached value for `{key}` holds a different row type"
                    ))),
                    None,
                ),
            },
            None if state.fetching => (FetchResult::Pending, None),
            None => match &state.error {
                Some(error) => (FetchResult::Error(error.clone()), None),
                None => (FetchResult::Pending, None),
            },
        };
        Self {
            result,
            refresh_error,
            is_fetching: state.fetching,
            settled_at: state.settled_at,
            issued_at: state.issued_at,
        }
    }
}

/// Live interest in one key. Dropping it releases the reference.
pub struct Subscription<T> {
    key: QueryKey,
    receiver: watch::Receiver<EntryState>,
    inner: Arc<CacheInner>,
    rows: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub(super) fn new(
        key: QueryKey,
        receiver: watch::Receiver<EntryState>,
        inner: Arc<CacheInner>,
    ) -> Self {
        Self {
            key,
            receiver,
            inner,
            rows: PhantomData,
        }
    }

    /// Key this subscription holds.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Read the current state without waiting.
    pub fn observe(&self) -> Observation<T> {
        let state = self.receiver.borrow();
        Observation::from_state(&state, &self.key)
    }

    /// Wait until no fetch is in flight, then observe.
    pub async fn settled(&mut self) -> Observation<T> {
        if self.receiver.wait_for(|state| !state.fetching).await.is_err() {
            debug!(key = %self.key, "cache entry dropped while awaiting settlement");
        }
        self.observe()
    }

    /// Wait for the next published change. Returns `false` once the entry is
    /// gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.inner.release(&self.key);
    }
}
