//! Demo gateway serving canned rows when no live endpoint is configured.
//!
//! Rows are fixed per table. Timestamps are placed relative to the injected
//! clock so the overview's trailing-week window always has data. Requests
//! are honoured only as far as their row limit; filters and ordering are
//! not evaluated.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use mockable::Clock;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::ports::{DataGateway, GatewayError, GatewayResponse, Record};
use crate::domain::request::{Table, TableRequest};

/// Canned-data implementation of [`DataGateway`].
pub struct DemoDataGateway {
    clock: Arc<dyn Clock>,
}

impl DemoDataGateway {
    /// Gateway stamping rows relative to `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl DataGateway for DemoDataGateway {
    async fn execute(&self, request: &TableRequest) -> Result<GatewayResponse, GatewayError> {
        let mut rows = canned_rows(request.table, self.clock.utc());
        if let Some(limit) = request.limit.and_then(|limit| usize::try_from(limit).ok()) {
            rows.truncate(limit);
        }
        debug!(table = %request.table, rows = rows.len(), "serving demo rows");
        Ok(GatewayResponse::ok(rows))
    }
}

fn canned_rows(table: Table, now: DateTime<Utc>) -> Vec<Record> {
    let at = |age: TimeDelta| (now - age).to_rfc3339_opts(SecondsFormat::Secs, true);
    let values = match table {
        Table::Insights => vec![
            json!({
                "id": "1",
                "title": "Reddit's New Moderation Tools Are Game-Changing",
                "brief": "Community moderators are reporting significant improvements in content quality after implementing the latest moderation features.",
                "permalink": "https://reddit.com/r/modnews/comments/example1",
                "rank_score": 95,
                "created_utc": at(TimeDelta::hours(3)),
                "topics": ["Content", "Analytics"],
                "source": "reddit"
            }),
            json!({
                "id": "2",
                "title": "SEO Best Practices for Reddit Marketing",
                "brief": "A comprehensive guide on how to effectively market your business on Reddit without violating community guidelines.",
                "permalink": "https://reddit.com/r/marketing/comments/example2",
                "rank_score": 88,
                "created_utc": at(TimeDelta::days(2)),
                "topics": ["SEO", "PPC"],
                "source": "reddit"
            }),
            json!({
                "id": "3",
                "title": "The Future of Content Creation on Social Platforms",
                "brief": "Analysis of how Reddit's recent policy changes are shaping the landscape of user-generated content.",
                "permalink": "https://reddit.com/r/technology/comments/example3",
                "rank_score": 82,
                "created_utc": at(TimeDelta::days(5)),
                "topics": ["Content"],
                "source": "hn"
            }),
        ],
        Table::Drafts => vec![
            json!({
                "id": "draft-1",
                "draft_title": "Moderation Tools Every Community Needs",
                "created_utc": at(TimeDelta::hours(6)),
                "source": "reddit",
                "brief": "Moderators say the new tooling cut spam reports in half."
            }),
            json!({
                "id": "draft-2",
                "draft_title": "Reddit SEO in Practice",
                "created_utc": at(TimeDelta::days(1)),
                "source": "reddit",
                "brief": "How marketers earn visibility without breaking community rules."
            }),
        ],
        Table::PipelineRuns => vec![json!({
            "status": "completed",
            "created_at": at(TimeDelta::zero())
        })],
        Table::Posts | Table::Comments => Vec::new(),
    };
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::rows::{Draft, Insight, InsightActivity};
    use crate::test_support::timing::MutableClock;

    #[fixture]
    fn gateway() -> DemoDataGateway {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 8, 12, 0, 0)
            .single()
            .expect("valid time");
        DemoDataGateway::new(Arc::new(MutableClock::new(now)))
    }

    async fn rows(gateway: &DemoDataGateway, request: TableRequest) -> Vec<Record> {
        gateway
            .execute(&request)
            .await
            .expect("demo gateway never fails")
            .into_rows()
            .expect("demo rows carry no error")
    }

    #[rstest]
    #[tokio::test]
    async fn insights_decode_as_every_projection(gateway: DemoDataGateway) {
        let records = rows(&gateway, TableRequest::select_all(Table::Insights)).await;
        assert_eq!(records.len(), 3);
        for record in records {
            let value = Value::Object(record);
            serde_json::from_value::<Insight>(value.clone()).expect("insight decodes");
            serde_json::from_value::<InsightActivity>(value).expect("activity decodes");
        }
    }

    #[rstest]
    #[tokio::test]
    async fn timestamps_follow_the_clock(gateway: DemoDataGateway) {
        let records = rows(&gateway, TableRequest::select_all(Table::Drafts)).await;
        let first: Draft =
            serde_json::from_value(Value::Object(records.into_iter().next().expect("a draft")))
                .expect("draft decodes");
        let expected = Utc
            .with_ymd_and_hms(2026, 3, 8, 6, 0, 0)
            .single()
            .expect("valid time");
        assert_eq!(first.created_utc, Some(expected));
    }

    #[rstest]
    #[tokio::test]
    async fn limit_truncates_canned_rows(gateway: DemoDataGateway) {
        let records = rows(&gateway, TableRequest::select_all(Table::Insights).with_limit(1)).await;
        assert_eq!(records.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn unused_tables_are_empty(gateway: DemoDataGateway) {
        assert!(rows(&gateway, TableRequest::select_all(Table::Comments)).await.is_empty());
    }
}
