//! Overview page: weekly activity sparkline, last pipeline run, top insights.
//!
//! The page composes three independent queries. The weekly activity query is
//! the page's primary decision; the other two render beside it and never
//! block it.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::{Page, PageQuery, PageView, RenderDecision, ViewController};
use crate::domain::query_cache::{FetchOptions, QueryCache};
use crate::domain::query_key::QueryKey;
use crate::domain::request::{FilterOp, FilterValue, Table, TableRequest};
use crate::domain::rows::{Insight, InsightActivity, PipelineRun};

/// Days covered by the activity window and the sparkline.
pub const ACTIVITY_WINDOW_DAYS: usize = 7;
/// Rows shown in the top insights panel.
pub const TOP_INSIGHTS_LIMIT: u32 = 10;
/// Wording shown beside an all-zero sparkline.
pub const NO_ACTIVITY_MESSAGE: &str = "No activity in the last 7 days.";

/// Insights created in the trailing seven days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeeklyActivityQuery;

impl PageQuery for WeeklyActivityQuery {
    type Row = InsightActivity;

    fn page(&self) -> Page {
        Page::Overview
    }

    fn query_key(&self) -> QueryKey {
        QueryKey::new("overview")
    }

    fn empty_message(&self) -> &'static str {
        NO_ACTIVITY_MESSAGE
    }

    fn request(&self, issued_at: DateTime<Utc>) -> TableRequest {
        let since = issued_at - TimeDelta::weeks(1);
        TableRequest::select(Table::Insights, ["id", "created_utc"]).with_filter(
            "created_utc",
            FilterOp::Gte,
            FilterValue::Timestamp(since),
        )
    }
}

/// Most recent pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastRunQuery;

impl PageQuery for LastRunQuery {
    type Row = PipelineRun;

    fn page(&self) -> Page {
        Page::Overview
    }

    fn query_key(&self) -> QueryKey {
        QueryKey::new("overview").with("last-run")
    }

    fn request(&self, _issued_at: DateTime<Utc>) -> TableRequest {
        TableRequest::select(Table::PipelineRuns, ["status", "created_at"])
            .with_order("created_at", false)
            .with_limit(1)
    }
}

/// Highest ranked insights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopInsightsQuery;

impl PageQuery for TopInsightsQuery {
    type Row = Insight;

    fn page(&self) -> Page {
        Page::Overview
    }

    fn query_key(&self) -> QueryKey {
        QueryKey::new("top-insights")
    }

    fn request(&self, _issued_at: DateTime<Utc>) -> TableRequest {
        TableRequest::select(
            Table::Insights,
            ["id", "title", "brief", "permalink", "rank_score"],
        )
        .with_order("rank_score", false)
        .with_limit(TOP_INSIGHTS_LIMIT)
    }
}

/// Daily insight counts for the trailing week. Index 6 is the most recent day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sparkline {
    /// Insight count per day, oldest first.
    pub buckets: [u32; ACTIVITY_WINDOW_DAYS],
}

impl Sparkline {
    /// Bucket `rows` by whole days elapsed before `reference`.
    ///
    /// `reference` is the instant the activity request was issued, so every
    /// row the week filter admitted lands in a bucket. A row `d` days old
    /// lands in bucket `6 - d`; a row exactly a week old joins bucket 0.
    /// Rows stamped after `reference` count as today; older rows are ignored.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeDelta, TimeZone, Utc};
    /// use dashboard::domain::rows::InsightActivity;
    /// use dashboard::domain::views::Sparkline;
    ///
    /// let now = Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap();
    /// let rows = [
    ///     InsightActivity { id: "a".into(), created_utc: now - TimeDelta::hours(2) },
    ///     InsightActivity { id: "b".into(), created_utc: now - TimeDelta::days(3) },
    /// ];
    /// let sparkline = Sparkline::from_activity(&rows, now);
    /// assert_eq!(sparkline.buckets, [0, 0, 0, 1, 0, 0, 1]);
    /// ```
    pub fn from_activity(rows: &[InsightActivity], reference: DateTime<Utc>) -> Self {
        let mut buckets = [0_u32; ACTIVITY_WINDOW_DAYS];
        let newest = ACTIVITY_WINDOW_DAYS - 1;
        for row in rows {
            let age = reference - row.created_utc;
            if age > TimeDelta::weeks(1) {
                continue;
            }
            let offset = usize::try_from(age.num_days())
                .unwrap_or(0)
                .min(newest);
            if let Some(count) = buckets.get_mut(newest - offset) {
                *count = count.saturating_add(1);
            }
        }
        Self { buckets }
    }

    /// Sum over all buckets.
    pub fn total(&self) -> u32 {
        self.buckets.iter().sum()
    }
}

/// Everything rendered on the overview page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewView {
    /// Insights created in the trailing week.
    pub activity: PageView<InsightActivity>,
    /// Present once the activity query has settled successfully.
    pub sparkline: Option<Sparkline>,
    /// Most recent pipeline run.
    pub last_run: PageView<PipelineRun>,
    /// Highest-ranked insights.
    pub top_insights: PageView<Insight>,
}

impl OverviewView {
    /// Most recent run, when the last-run query returned one.
    pub fn latest_run(&self) -> Option<&PipelineRun> {
        self.last_run.decision.rows().and_then(<[PipelineRun]>::first)
    }
}

/// Controller composing the three overview queries.
pub struct OverviewController {
    activity: ViewController<WeeklyActivityQuery>,
    last_run: ViewController<LastRunQuery>,
    top_insights: ViewController<TopInsightsQuery>,
}

impl OverviewController {
    /// Controller whose three queries share `cache`.
    pub fn new(cache: &QueryCache, options: FetchOptions) -> Self {
        Self {
            activity: ViewController::new(cache.clone(), options),
            last_run: ViewController::new(cache.clone(), options),
            top_insights: ViewController::new(cache.clone(), options),
        }
    }

    /// Evaluate all three queries and return the current view.
    pub fn render(&mut self) -> OverviewView {
        assemble(
            self.activity.render(&WeeklyActivityQuery),
            self.last_run.render(&LastRunQuery),
            self.top_insights.render(&TopInsightsQuery),
        )
    }

    /// Render and wait for all three queries to settle.
    ///
    /// All three are mounted before the first wait, so their gateway calls
    /// run concurrently.
    pub async fn settle(&mut self) -> OverviewView {
        self.render();
        let activity = self.activity.settle(&WeeklyActivityQuery).await;
        let last_run = self.last_run.settle(&LastRunQuery).await;
        let top_insights = self.top_insights.settle(&TopInsightsQuery).await;
        assemble(activity, last_run, top_insights)
    }

    /// Refetch all three queries. Returns how many fetches started.
    pub fn refresh(&self) -> usize {
        [
            self.activity.refresh(),
            self.last_run.refresh(),
            self.top_insights.refresh(),
        ]
        .into_iter()
        .filter(|started| *started)
        .count()
    }
}

fn assemble(
    activity: PageView<InsightActivity>,
    last_run: PageView<PipelineRun>,
    top_insights: PageView<Insight>,
) -> OverviewView {
    let sparkline = match (&activity.decision, activity.issued_at) {
        (RenderDecision::Populated(rows), Some(issued_at)) => {
            Some(Sparkline::from_activity(rows, issued_at))
        }
        (RenderDecision::Empty { .. }, _) => Some(Sparkline::default()),
        _ => None,
    };
    OverviewView {
        activity,
        sparkline,
        last_run,
        top_insights,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    fn loading<T>() -> PageView<T> {
        PageView {
            page: Page::Overview,
            decision: RenderDecision::Loading,
            refresh_error: None,
            is_refreshing: false,
            settled_at: None,
            issued_at: None,
        }
    }

    fn activity(id: &str, created_utc: DateTime<Utc>) -> InsightActivity {
        InsightActivity {
            id: id.to_owned(),
            created_utc,
        }
    }

    #[rstest]
    #[case(TimeDelta::zero(), 6)]
    #[case(TimeDelta::hours(23), 6)]
    #[case(TimeDelta::hours(25), 5)]
    #[case(TimeDelta::days(6) + TimeDelta::hours(23), 0)]
    fn rows_land_in_day_offset_bucket(
        now: DateTime<Utc>,
        #[case] age: TimeDelta,
        #[case] expected_index: usize,
    ) {
        let sparkline = Sparkline::from_activity(&[activity("a", now - age)], now);
        let mut expected = [0; ACTIVITY_WINDOW_DAYS];
        expected[expected_index] = 1;
        assert_eq!(sparkline.buckets, expected);
    }

    #[rstest]
    fn future_rows_count_as_today(now: DateTime<Utc>) {
        let sparkline =
            Sparkline::from_activity(&[activity("a", now + TimeDelta::minutes(5))], now);
        assert_eq!(sparkline.buckets[ACTIVITY_WINDOW_DAYS - 1], 1);
    }

    #[rstest]
    fn rows_older_than_a_week_are_ignored(now: DateTime<Utc>) {
        let stale = now - TimeDelta::days(7) - TimeDelta::seconds(1);
        let sparkline = Sparkline::from_activity(&[activity("a", stale)], now);
        assert_eq!(sparkline.total(), 0);
    }

    #[rstest]
    fn row_on_the_window_boundary_joins_the_oldest_bucket(now: DateTime<Utc>) {
        let sparkline = Sparkline::from_activity(&[activity("a", now - TimeDelta::days(7))], now);
        assert_eq!(sparkline.buckets, [1, 0, 0, 0, 0, 0, 0]);
    }

    #[rstest]
    fn sparkline_is_bucketed_from_the_request_instant(now: DateTime<Utc>) {
        let rows = vec![
            activity("edge", now - TimeDelta::days(6) - TimeDelta::hours(23)),
            activity("fresh", now - TimeDelta::hours(1)),
        ];
        let activity = PageView {
            page: Page::Overview,
            decision: RenderDecision::Populated(Arc::new(rows)),
            refresh_error: None,
            is_refreshing: false,
            settled_at: Some(now + TimeDelta::hours(2)),
            issued_at: Some(now),
        };

        let overview = assemble(activity, loading(), loading());

        let sparkline = overview.sparkline.expect("sparkline for populated activity");
        assert_eq!(sparkline.total(), 2);
        assert_eq!(sparkline.buckets, [1, 0, 0, 0, 0, 0, 1]);
    }

    #[rstest]
    fn empty_activity_uses_its_own_wording() {
        assert_eq!(WeeklyActivityQuery.empty_message(), NO_ACTIVITY_MESSAGE);
        assert_eq!(TopInsightsQuery.empty_message(), "No insights found.");
    }

    #[rstest]
    fn bucketing_is_deterministic(now: DateTime<Utc>) {
        let rows: Vec<_> = (0..20)
            .map(|hours| activity(&format!("row-{hours}"), now - TimeDelta::hours(hours * 7)))
            .collect();
        let first = Sparkline::from_activity(&rows, now);
        let second = Sparkline::from_activity(&rows, now);
        assert_eq!(first, second);
        assert_eq!(first.total(), 20);
    }

    #[rstest]
    fn activity_request_filters_the_trailing_week(now: DateTime<Utc>) {
        let request = WeeklyActivityQuery.request(now);
        assert_eq!(request.table, Table::Insights);
        assert_eq!(request.columns_clause(), "id,created_utc");
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.filters[0].op, FilterOp::Gte);
        assert_eq!(
            request.filters[0].value,
            FilterValue::Timestamp(now - TimeDelta::days(7))
        );
    }

    #[rstest]
    fn side_panels_use_their_own_keys() {
        assert_ne!(LastRunQuery.query_key(), WeeklyActivityQuery.query_key());
        assert_eq!(TopInsightsQuery.query_key().to_string(), "top-insights");

        let last_run = LastRunQuery.request(Utc::now());
        assert_eq!(last_run.limit, Some(1));
        assert_eq!(last_run.order.map(|order| order.ascending), Some(false));

        let top = TopInsightsQuery.request(Utc::now());
        assert_eq!(top.limit, Some(TOP_INSIGHTS_LIMIT));
        assert_eq!(top.order.map(|order| order.column), Some("rank_score".to_owned()));
    }
}
