//! Cache entry bookkeeping and the fetch-trigger rules.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::{ErasedFetcher, FetchOptions, Payload};
use crate::domain::ports::GatewayError;

/// State published to subscribers of one key.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntryState {
    /// Last successfully fetched rows, type-erased.
    pub(crate) value: Option<Payload>,
    /// Last terminal error; cleared by the next success.
    pub(crate) error: Option<GatewayError>,
    /// Instant of the last successful settlement.
    pub(crate) settled_at: Option<DateTime<Utc>>,
    /// Instant the request behind `value` was issued.
    pub(crate) issued_at: Option<DateTime<Utc>>,
    /// Instant of the last settlement of either kind.
    pub(crate) attempted_at: Option<DateTime<Utc>>,
    /// Whether a fetch is in flight.
    pub(crate) fetching: bool,
}

/// Why the scheduler is considering a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchTrigger {
    /// A new subscriber arrived for the key.
    Mount,
    /// An existing subscriber re-rendered without changing key.
    Render,
    /// The application regained focus.
    FocusRegained,
    /// The user asked for fresh data.
    Manual,
}

pub(crate) struct CacheEntry {
    pub(crate) state: watch::Sender<EntryState>,
    pub(crate) subscribers: usize,
    pub(crate) idle_since: Option<DateTime<Utc>>,
    pub(crate) in_flight: Option<u64>,
    pub(crate) fetcher: ErasedFetcher,
    pub(crate) options: FetchOptions,
}

impl CacheEntry {
    pub(crate) fn new(fetcher: ErasedFetcher, options: FetchOptions) -> Self {
        let (state, _) = watch::channel(EntryState::default());
        Self {
            state,
            subscribers: 0,
            idle_since: None,
            in_flight: None,
            fetcher,
            options,
        }
    }

    /// Decide whether `trigger` should start a gateway call at `now`.
    ///
    /// Only a manual refetch may start a call while another is in flight.
    pub(crate) fn wants_fetch(&self, trigger: FetchTrigger, now: DateTime<Utc>) -> bool {
        if self.in_flight.is_some() {
            return trigger == FetchTrigger::Manual;
        }
        let state = self.state.borrow();
        let stale_time = self.options.stale_time;
        match trigger {
            FetchTrigger::Manual => true,
            FetchTrigger::Mount => {
                state.value.is_none() || elapsed_beyond(state.settled_at, now, stale_time)
            }
            FetchTrigger::Render => elapsed_beyond(state.attempted_at, now, stale_time),
            FetchTrigger::FocusRegained => {
                self.options.refetch_on_focus_regain
                    && self.subscribers > 0
                    && elapsed_beyond(state.settled_at, now, stale_time)
            }
        }
    }

    /// Whether the entry may be dropped at `now`.
    pub(crate) fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        if self.subscribers > 0 || self.in_flight.is_some() {
            return false;
        }
        let Some(idle_since) = self.idle_since else {
            return false;
        };
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return false;
        };
        now - idle_since >= retention
    }
}

/// `true` when more than `window` has passed since `since`, or `since` is
/// unknown.
pub(crate) fn elapsed_beyond(
    since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    let Some(since) = since else {
        return true;
    };
    // Windows too large for chrono count as elapsed.
    let Ok(window) = chrono::Duration::from_std(window) else {
        return true;
    };
    now - since > window
}
