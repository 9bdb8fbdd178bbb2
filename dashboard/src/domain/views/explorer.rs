//! Explorer page: free-text title search with an optional source filter.

use chrono::{DateTime, Utc};

use super::{Page, PageQuery};
use crate::domain::query_key::QueryKey;
use crate::domain::request::{FilterOp, FilterValue, Table, TableRequest};
use crate::domain::rows::Insight;

/// Rows shown per search.
pub const EXPLORER_LIMIT: u32 = 100;

/// Parameters of the explorer page.
///
/// Both inputs are trimmed. An empty search applies no text filter and an
/// empty source means no source filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExplorerQuery {
    search: String,
    source: Option<String>,
}

impl ExplorerQuery {
    /// Build a query from raw user input.
    pub fn new(search: &str, source: Option<&str>) -> Self {
        Self {
            search: search.trim().to_owned(),
            source: source
                .map(str::trim)
                .filter(|source| !source.is_empty())
                .map(str::to_owned),
        }
    }

    /// Trimmed search text.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Trimmed source filter, absent when blank.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl PageQuery for ExplorerQuery {
    type Row = Insight;

    fn page(&self) -> Page {
        Page::Explorer
    }

    fn query_key(&self) -> QueryKey {
        QueryKey::new("explorer")
            .with(self.search.as_str())
            .with(self.source.clone())
    }

    fn request(&self, _issued_at: DateTime<Utc>) -> TableRequest {
        let mut request = TableRequest::select_all(Table::Insights)
            .with_order("created_utc", false)
            .with_limit(EXPLORER_LIMIT);
        if !self.search.is_empty() {
            request = request.with_filter(
                "title",
                FilterOp::Ilike,
                FilterValue::Text(format!("%{}%", escape_like(&self.search))),
            );
        }
        if let Some(source) = &self.source {
            request = request.with_filter("source", FilterOp::Eq, FilterValue::Text(source.clone()));
        }
        request
    }
}

/// Escape `LIKE` metacharacters so `text` matches literally. `*` is escaped
/// too because PostgREST reads it as a wildcard.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\' | '*') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
