//! Page view controllers.
//!
//! A controller derives a [`QueryKey`] and a [`TableRequest`] from the page's
//! parameters, holds one cache subscription for the current key, and turns
//! each observation into exactly one [`RenderDecision`]. Switching parameters
//! subscribes to the new key before releasing the old one, so an in-flight
//! answer for the old key can never reach the new view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::ports::{DataGateway, GatewayError};
use crate::domain::query_cache::{
    FetchContext, FetchOptions, FetchResult, Observation, QueryCache, Subscription,
};
use crate::domain::query_key::QueryKey;
use crate::domain::request::TableRequest;

pub mod drafts;
pub mod explorer;
pub mod overview;
pub mod topics;

pub use drafts::DraftsQuery;
pub use explorer::ExplorerQuery;
pub use overview::{
    LastRunQuery, NO_ACTIVITY_MESSAGE, OverviewController, OverviewView, Sparkline,
    TopInsightsQuery, WeeklyActivityQuery,
};
pub use topics::{ParseTopicCategoryError, ParseTopicSortError, TopicCategory, TopicSort, TopicsQuery};

/// Message shown when the gateway supplied none.
pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong.";

/// Dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Weekly activity, last pipeline run and top insights.
    Overview,
    /// Insights browsed by topic category.
    Topics,
    /// Free-text search over insight titles.
    Explorer,
    /// Saved drafts.
    Drafts,
}

impl Page {
    /// Wording shown when the page's query settles with zero rows.
    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Overview => "No insights found.",
            Self::Topics | Self::Explorer => "No results.",
            Self::Drafts => "No drafts yet.",
        }
    }
}

/// Failure categories surfaced to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The gateway could not be reached.
    Network,
    /// The gateway answered with a structured error.
    Remote,
    /// The gateway's rows did not match the page's row shape.
    Decode,
}

/// Error shown in place of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable detail, never blank.
    pub message: String,
}

impl From<&GatewayError> for ErrorNotice {
    fn from(error: &GatewayError) -> Self {
        let kind = match error {
            GatewayError::Network { .. } => ErrorKind::Network,
            GatewayError::Remote { .. } => ErrorKind::Remote,
            GatewayError::Decode { .. } => ErrorKind::Decode,
        };
        let message = error.message().trim();
        Self {
            kind,
            message: if message.is_empty() {
                FALLBACK_ERROR_MESSAGE.to_owned()
            } else {
                message.to_owned()
            },
        }
    }
}

/// Four-way branch selected for a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RenderDecision<T> {
    /// No value has settled yet.
    Loading,
    /// The request failed and there is nothing to fall back to.
    Error(ErrorNotice),
    /// The request succeeded with zero rows. Never an error.
    Empty {
        /// Page-specific wording for the empty state.
        message: &'static str,
    },
    /// One or more rows, in gateway order.
    Populated(Arc<Vec<T>>),
}

impl<T> RenderDecision<T> {
    /// Rows behind a populated decision.
    pub fn rows(&self) -> Option<&[T]> {
        match self {
            Self::Populated(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }
}

/// Everything the shell needs to draw one page query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView<T> {
    /// Page the query belongs to.
    pub page: Page,
    /// Branch the shell should draw.
    pub decision: RenderDecision<T>,
    /// Background refresh failure while older rows stay visible.
    pub refresh_error: Option<ErrorNotice>,
    /// Whether a background refresh of visible rows is running.
    pub is_refreshing: bool,
    /// Instant the visible rows settled.
    pub settled_at: Option<DateTime<Utc>>,
    /// Instant the request behind the visible rows was issued.
    pub issued_at: Option<DateTime<Utc>>,
}

/// Select the render branch for one observation.
///
/// # Examples
/// ```
/// use dashboard::domain::ports::GatewayError;
/// use dashboard::domain::query_cache::{FetchResult, Observation};
/// use dashboard::domain::views::{classify, Page, RenderDecision};
///
/// let observation: Observation<String> = Observation {
///     result: FetchResult::Error(GatewayError::remote("Database error")),
///     refresh_error: None,
///     is_fetching: false,
///     settled_at: None,
///     issued_at: None,
/// };
/// let view = classify(Page::Drafts, observation);
/// match view.decision {
///     RenderDecision::Error(notice) => assert_eq!(notice.message, "Database error"),
///     other => panic!("unexpected decision: {other:?}"),
/// }
/// ```
pub fn classify<T>(page: Page, observation: Observation<T>) -> PageView<T> {
    classify_with(page, page.empty_message(), observation)
}

/// Like [`classify`], with the wording shown for an empty result.
pub fn classify_with<T>(
    page: Page,
    empty_message: &'static str,
    observation: Observation<T>,
) -> PageView<T> {
    let has_rows = matches!(observation.result, FetchResult::Ok(_));
    let decision = match observation.result {
        FetchResult::Pending => RenderDecision::Loading,
        FetchResult::Error(error) => RenderDecision::Error(ErrorNotice::from(&error)),
        FetchResult::Ok(rows) if rows.is_empty() => RenderDecision::Empty {
            message: empty_message,
        },
        FetchResult::Ok(rows) => RenderDecision::Populated(rows),
    };
    PageView {
        page,
        decision,
        refresh_error: observation.refresh_error.as_ref().map(ErrorNotice::from),
        is_refreshing: has_rows && observation.is_fetching,
        settled_at: observation.settled_at,
        issued_at: observation.issued_at,
    }
}

/// Execute `request` and decode every returned record as `R`.
///
/// A structured API error wins over any rows returned beside it.
pub async fn fetch_rows<R: DeserializeOwned>(
    gateway: &dyn DataGateway,
    request: &TableRequest,
) -> Result<Vec<R>, GatewayError> {
    let records = gateway.execute(request).await?.into_rows()?;
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(Value::Object(record)).map_err(|error| {
                GatewayError::decode(format!("{} row: {error}", request.table))
            })
        })
        .collect()
}

/// Parameters of one page query.
pub trait PageQuery: Clone + Send + Sync + 'static {
    /// Row type decoded from the gateway's records.
    type Row: DeserializeOwned + Send + Sync + 'static;

    /// Page the query belongs to.
    fn page(&self) -> Page;

    /// Cache key covering every parameter that changes the request.
    fn query_key(&self) -> QueryKey;

    /// Request issued at `issued_at`.
    fn request(&self, issued_at: DateTime<Utc>) -> TableRequest;

    /// Wording shown when the query settles with zero rows.
    fn empty_message(&self) -> &'static str {
        self.page().empty_message()
    }
}

/// Holds the subscription for one page query and classifies its state.
pub struct ViewController<Q: PageQuery> {
    cache: QueryCache,
    options: FetchOptions,
    current: Option<Subscription<Q::Row>>,
}

impl<Q: PageQuery> ViewController<Q> {
    /// Controller with no subscription yet.
    pub fn new(cache: QueryCache, options: FetchOptions) -> Self {
        Self {
            cache,
            options,
            current: None,
        }
    }

    /// Evaluate `query` and return the current view.
    ///
    /// A changed key mounts a new subscription; an unchanged key only
    /// revalidates, which never reaches the gateway while the last attempt
    /// is within the freshness window.
    pub fn render(&mut self, query: &Q) -> PageView<Q::Row> {
        let key = query.query_key();
        if let Some(subscription) = self.current.as_ref().filter(|held| *held.key() == key) {
            self.cache.revalidate(subscription);
            return self.view_of(query);
        }
        let next = self
            .cache
            .subscribe(key, fetch_fn(query.clone()), self.options);
        // Release the previous key only once the new one is held.
        drop(self.current.replace(next));
        self.view_of(query)
    }

    /// Render `query`, then wait until its fetch settles.
    pub async fn settle(&mut self, query: &Q) -> PageView<Q::Row> {
        self.render(query);
        if let Some(subscription) = self.current.as_mut() {
            subscription.settled().await;
        }
        self.view_of(query)
    }

    /// Refetch the current key regardless of freshness.
    pub fn refresh(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|subscription| self.cache.refetch(subscription.key()))
    }

    /// Wait for the next state change of the current key.
    ///
    /// Returns `false` when nothing is subscribed.
    pub async fn changed(&mut self) -> bool {
        match self.current.as_mut() {
            Some(subscription) => subscription.changed().await,
            None => false,
        }
    }

    /// Key of the current subscription.
    pub fn current_key(&self) -> Option<&QueryKey> {
        self.current.as_ref().map(Subscription::key)
    }

    /// Classify the current state of `query` without revalidating.
    pub fn current_view(&self, query: &Q) -> Option<PageView<Q::Row>> {
        self.current.as_ref().map(|subscription| {
            classify_with(query.page(), query.empty_message(), subscription.observe())
        })
    }

    fn view_of(&self, query: &Q) -> PageView<Q::Row> {
        self.current_view(query).unwrap_or_else(|| PageView {
            page: query.page(),
            decision: RenderDecision::Loading,
            refresh_error: None,
            is_refreshing: false,
            settled_at: None,
            issued_at: None,
        })
    }
}

type RowFuture<R> = BoxFuture<'static, Result<Vec<R>, GatewayError>>;

fn fetch_fn<Q: PageQuery>(query: Q) -> impl Fn(FetchContext) -> RowFuture<Q::Row> + Send + Sync {
    move |context: FetchContext| {
        let request = query.request(context.issued_at);
        async move { fetch_rows::<Q::Row>(context.gateway.as_ref(), &request).await }.boxed()
    }
}
