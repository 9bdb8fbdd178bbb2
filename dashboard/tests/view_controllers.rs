//! End-to-end behaviour of page controllers over the query cache.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use dashboard::domain::ports::DataGateway;
use dashboard::domain::query_cache::{DEFAULT_RETENTION, FetchOptions, QueryCache};
use dashboard::domain::request::{FilterOp, Table};
use dashboard::domain::views::{
    DraftsQuery, ErrorKind, ErrorNotice, ExplorerQuery, NO_ACTIVITY_MESSAGE, OverviewController,
    PageQuery, RenderDecision, TopicCategory, TopicSort, TopicsQuery, ViewController,
};
use dashboard::outbound::DemoDataGateway;
use dashboard::test_support::gateway::{ScriptStep, ScriptedGateway};
use dashboard::test_support::timing::{ImmediateSleeper, MutableClock};
use rstest::{fixture, rstest};
use serde_json::json;
use tokio::sync::Notify;

struct World {
    cache: QueryCache,
    gateway: Arc<ScriptedGateway>,
    clock: Arc<MutableClock>,
}

#[fixture]
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0)
        .single()
        .expect("valid time")
}

fn world(steps: Vec<ScriptStep>, start: DateTime<Utc>) -> World {
    let clock = Arc::new(MutableClock::new(start));
    let gateway = Arc::new(ScriptedGateway::new(steps));
    let cache = QueryCache::with_sleeper(
        Arc::clone(&gateway) as Arc<dyn DataGateway>,
        Arc::clone(&clock) as Arc<dyn mockable::Clock>,
        Arc::new(ImmediateSleeper),
        DEFAULT_RETENTION,
    );
    World {
        cache,
        gateway,
        clock,
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

#[rstest]
#[tokio::test]
async fn overview_with_recent_rows_is_populated(start: DateTime<Utc>) {
    let world = world(
        vec![
            ScriptStep::rows(json!([
                { "id": "a", "created_utc": timestamp(start - TimeDelta::hours(1)) },
                { "id": "b", "created_utc": timestamp(start - TimeDelta::days(4)) }
            ]))
            .when(|request| {
                request.table == Table::Insights
                    && request.filters.iter().any(|filter| filter.op == FilterOp::Gte)
            }),
            ScriptStep::rows(json!([{ "status": "completed", "created_at": timestamp(start) }]))
                .when(|request| request.table == Table::PipelineRuns),
            ScriptStep::rows(json!([
                { "id": "t-1", "title": "Top", "rank_score": 95 }
            ]))
            .when(|request| request.table == Table::Insights),
        ],
        start,
    );
    let mut overview = OverviewController::new(&world.cache, FetchOptions::default());

    let view = overview.settle().await;

    assert_eq!(view.activity.decision.rows().map(<[_]>::len), Some(2));
    let sparkline = view.sparkline.expect("sparkline for settled activity");
    assert_eq!(sparkline.total(), 2);
    assert_eq!(sparkline.buckets, [0, 0, 1, 0, 0, 0, 1]);
    assert_eq!(
        view.latest_run().and_then(|run| run.status.as_deref()),
        Some("completed")
    );
    assert_eq!(view.top_insights.decision.rows().map(<[_]>::len), Some(1));
    assert_eq!(world.gateway.call_count(), 3);
}

#[rstest]
#[tokio::test]
async fn overview_panels_fetch_while_activity_is_pending(start: DateTime<Utc>) {
    let activity_gate = Arc::new(Notify::new());
    let world = world(
        vec![
            ScriptStep::rows(json!([
                { "id": "a", "created_utc": timestamp(start - TimeDelta::hours(3)) }
            ]))
            .when(|request| {
                request.table == Table::Insights
                    && request.filters.iter().any(|filter| filter.op == FilterOp::Gte)
            })
            .gated(Arc::clone(&activity_gate)),
            ScriptStep::rows(json!([])),
        ],
        start,
    );
    let mut overview = OverviewController::new(&world.cache, FetchOptions::default());
    let settling = tokio::spawn(async move { overview.settle().await });

    world.gateway.wait_for_calls(3).await;
    activity_gate.notify_one();
    let view = settling.await.expect("overview task completes");

    assert_eq!(view.sparkline.map(|sparkline| sparkline.total()), Some(1));
    assert_eq!(world.gateway.call_count(), 3);
}

#[rstest]
#[tokio::test]
async fn empty_overview_reports_no_activity(start: DateTime<Utc>) {
    let world = world(vec![ScriptStep::rows(json!([]))], start);
    let mut overview = OverviewController::new(&world.cache, FetchOptions::default());

    let view = overview.settle().await;

    assert_eq!(
        view.activity.decision,
        RenderDecision::Empty {
            message: NO_ACTIVITY_MESSAGE
        }
    );
    assert_eq!(view.sparkline.map(|sparkline| sparkline.total()), Some(0));
    assert_eq!(
        view.top_insights.decision,
        RenderDecision::Empty {
            message: "No insights found."
        }
    );
}

#[rstest]
#[tokio::test]
async fn explorer_without_matches_is_empty_not_error(start: DateTime<Utc>) {
    let world = world(vec![ScriptStep::rows(json!([]))], start);
    let mut explorer = ViewController::new(world.cache.clone(), FetchOptions::default());

    let view = explorer.settle(&ExplorerQuery::new("widget", None)).await;

    assert_eq!(
        view.decision,
        RenderDecision::Empty {
            message: "No results."
        }
    );
    assert!(view.refresh_error.is_none());
    let calls = world.gateway.calls();
    let ilike = calls
        .first()
        .and_then(|request| request.filters.first())
        .map(|filter| (filter.op, filter.value.to_text()));
    assert_eq!(ilike, Some((FilterOp::Ilike, "%widget%".to_owned())));
}

#[rstest]
#[case(TopicSort::CreatedTime, true)]
#[case(TopicSort::RankScore, false)]
#[tokio::test]
async fn topic_sort_sets_request_direction(
    start: DateTime<Utc>,
    #[case] sort: TopicSort,
    #[case] ascending: bool,
) {
    let world = world(vec![ScriptStep::rows(json!([{ "id": "i-1" }]))], start);
    let mut topics = ViewController::new(world.cache.clone(), FetchOptions::default());

    topics
        .settle(&TopicsQuery {
            category: TopicCategory::Seo,
            sort,
        })
        .await;

    let order = world
        .gateway
        .calls()
        .first()
        .and_then(|request| request.order.clone())
        .expect("ordered request");
    assert_eq!(order.ascending, ascending);
}

#[rstest]
#[tokio::test]
async fn changing_topic_sort_reissues_the_query(start: DateTime<Utc>) {
    let world = world(vec![ScriptStep::rows(json!([{ "id": "i-1" }]))], start);
    let mut topics = ViewController::new(world.cache.clone(), FetchOptions::default());
    let by_rank = TopicsQuery::default();
    let by_age = TopicsQuery {
        sort: TopicSort::CreatedTime,
        ..by_rank
    };

    topics.settle(&by_rank).await;
    topics.settle(&by_age).await;
    topics.settle(&by_rank).await;

    assert_eq!(world.gateway.call_count(), 2);
    assert_eq!(topics.current_key(), Some(&by_rank.query_key()));
}

#[rstest]
#[tokio::test]
async fn repeated_renders_within_freshness_window_reuse_the_value(start: DateTime<Utc>) {
    let world = world(vec![ScriptStep::rows(json!([{ "id": "d-1" }]))], start);
    let mut drafts = ViewController::new(world.cache.clone(), FetchOptions::default());
    let settled = drafts.settle(&DraftsQuery).await;

    world.clock.advance(Duration::from_secs(30));
    let again = drafts.render(&DraftsQuery);
    let once_more = drafts.render(&DraftsQuery);

    let mut other_page = ViewController::new(world.cache.clone(), FetchOptions::default());
    let mounted = other_page.render(&DraftsQuery);

    assert_eq!(again, settled);
    assert_eq!(once_more, settled);
    assert_eq!(mounted, settled);
    assert_eq!(world.gateway.call_count(), 1);
}

#[rstest]
#[tokio::test]
async fn structured_error_with_null_rows_shows_its_message(start: DateTime<Utc>) {
    let world = world(vec![ScriptStep::remote_error("Database error")], start);
    let mut drafts = ViewController::new(world.cache.clone(), FetchOptions::default());

    let view = drafts.settle(&DraftsQuery).await;

    assert_eq!(
        view.decision,
        RenderDecision::Error(ErrorNotice {
            kind: ErrorKind::Remote,
            message: "Database error".to_owned(),
        })
    );
    assert_eq!(world.gateway.call_count(), 3);
}

#[rstest]
#[tokio::test]
async fn failed_background_refresh_keeps_cached_rows(start: DateTime<Utc>) {
    let world = world(
        vec![
            ScriptStep::rows(json!([{ "id": "1" }, { "id": "2" }, { "id": "3" }])).once(),
            ScriptStep::remote_error("Database error"),
        ],
        start,
    );
    let mut drafts = ViewController::new(world.cache.clone(), FetchOptions::default());
    let cached = drafts.settle(&DraftsQuery).await;

    world.clock.advance(Duration::from_secs(61));
    let view = drafts.settle(&DraftsQuery).await;

    assert_eq!(view.decision, cached.decision);
    assert_eq!(view.decision.rows().map(<[_]>::len), Some(3));
    assert_eq!(
        view.refresh_error,
        Some(ErrorNotice {
            kind: ErrorKind::Remote,
            message: "Database error".to_owned(),
        })
    );
    assert_eq!(view.settled_at, cached.settled_at);
}

#[rstest]
#[tokio::test]
async fn two_pages_on_one_key_share_a_single_call(start: DateTime<Utc>) {
    let gate = Arc::new(Notify::new());
    let world = world(
        vec![ScriptStep::rows(json!([{ "id": "d-1" }])).gated(Arc::clone(&gate))],
        start,
    );
    let mut left = ViewController::new(world.cache.clone(), FetchOptions::default());
    let mut right = ViewController::new(world.cache.clone(), FetchOptions::default());

    assert_eq!(left.render(&DraftsQuery).decision, RenderDecision::Loading);
    assert_eq!(right.render(&DraftsQuery).decision, RenderDecision::Loading);
    gate.notify_one();

    let a = left.settle(&DraftsQuery).await;
    let b = right.settle(&DraftsQuery).await;

    assert_eq!(a, b);
    assert_eq!(world.gateway.call_count(), 1);
}

#[rstest]
#[tokio::test]
async fn slow_search_never_overwrites_newer_search(start: DateTime<Utc>) {
    let slow = Arc::new(Notify::new());
    let world = world(
        vec![
            ScriptStep::rows(json!([{ "id": "from-first" }]))
                .when(|request| {
                    request
                        .filters
                        .iter()
                        .any(|filter| filter.value.to_text() == "%first%")
                })
                .gated(Arc::clone(&slow)),
            ScriptStep::rows(json!([{ "id": "from-second" }])),
        ],
        start,
    );
    let mut explorer = ViewController::new(world.cache.clone(), FetchOptions::default());
    let first = ExplorerQuery::new("first", None);
    let second = ExplorerQuery::new("second", None);

    explorer.render(&first);
    world.gateway.wait_for_calls(1).await;
    let newer = explorer.settle(&second).await;

    slow.notify_one();
    world.gateway.wait_for_completed(2).await;
    tokio::task::yield_now().await;

    let current = explorer.render(&second);
    assert_eq!(current.decision, newer.decision);

    let mut revisit = ViewController::new(world.cache.clone(), FetchOptions::default());
    let older = revisit.render(&first);
    let ids: Vec<_> = older
        .decision
        .rows()
        .map(|rows| rows.iter().map(|row| row.id.clone()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["from-first".to_owned()]);
    assert_eq!(world.gateway.call_count(), 2);
}

#[rstest]
#[tokio::test]
async fn demo_gateway_populates_every_page(start: DateTime<Utc>) {
    let clock = Arc::new(MutableClock::new(start));
    let cache = QueryCache::new(
        Arc::new(DemoDataGateway::new(Arc::clone(&clock) as Arc<dyn mockable::Clock>)),
        clock,
        DEFAULT_RETENTION,
    );

    let overview = OverviewController::new(&cache, FetchOptions::default())
        .settle()
        .await;
    assert_eq!(overview.sparkline.map(|sparkline| sparkline.total()), Some(3));

    let mut drafts = ViewController::new(cache.clone(), FetchOptions::default());
    let view = drafts.settle(&DraftsQuery).await;
    assert_eq!(view.decision.rows().map(<[_]>::len), Some(2));
}
