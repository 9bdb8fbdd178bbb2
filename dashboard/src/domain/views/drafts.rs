//! Drafts page: the most recent drafts, newest first.

use chrono::{DateTime, Utc};

use super::{Page, PageQuery};
use crate::domain::query_key::QueryKey;
use crate::domain::request::{Table, TableRequest};
use crate::domain::rows::Draft;

/// Rows shown on the drafts page.
pub const DRAFTS_LIMIT: u32 = 100;

/// Parameterless query behind the drafts page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DraftsQuery;

impl PageQuery for DraftsQuery {
    type Row = Draft;

    fn page(&self) -> Page {
        Page::Drafts
    }

    fn query_key(&self) -> QueryKey {
        QueryKey::new("drafts")
    }

    fn request(&self, _issued_at: DateTime<Utc>) -> TableRequest {
        TableRequest::select(
            Table::Drafts,
            ["id", "draft_title", "created_utc", "source", "brief"],
        )
        .with_order("created_utc", false)
        .with_limit(DRAFTS_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn drafts_request_is_newest_first_and_capped() {
        let request = DraftsQuery.request(Utc::now());
        assert_eq!(request.table, Table::Drafts);
        assert!(request.filters.is_empty());
        assert_eq!(request.limit, Some(DRAFTS_LIMIT));
        let order = request.order.expect("ordered request");
        assert_eq!(order.column, "created_utc");
        assert!(!order.ascending);
    }
}
