//! Immutable request descriptors handed whole to the data gateway.
//!
//! A [`TableRequest`] names a table, the projected columns, zero or more
//! filters, an optional ordering and an optional row limit. View controllers
//! build one per fetch; adapters translate it into their wire format without
//! ever handing a mutable builder back to the caller.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Tables exposed by the hosted data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Raw community posts.
    Posts,
    /// Comments attached to posts.
    Comments,
    /// Ranked insights derived from posts.
    Insights,
    /// Article drafts generated from insights.
    Drafts,
    /// Pipeline run bookkeeping.
    PipelineRuns,
}

impl Table {
    /// Table name as understood by the hosted API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Insights => "insights",
            Self::Drafts => "drafts",
            Self::PipelineRuns => "pipeline_runs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Column equals the value.
    Eq,
    /// Case-insensitive `LIKE` pattern match.
    Ilike,
    /// Array column contains every listed element.
    Contains,
    /// Column is greater than or equal to the value.
    Gte,
}

/// Right-hand side of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Plain text (also used for `LIKE` patterns).
    Text(String),
    /// Array literal for containment checks.
    List(Vec<String>),
    /// Instant compared against timestamp columns.
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Render the value as plain text, with timestamps in RFC 3339 form.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::List(values) => values.join(","),
            Self::Timestamp(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// One `(column, operator, value)` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Filter {
    /// Column the predicate applies to.
    pub column: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison value.
    pub value: FilterValue,
}

/// Requested row ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Order {
    /// Column to sort by.
    pub column: String,
    /// `true` for ascending order.
    pub ascending: bool,
}

/// Complete description of one read against the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableRequest {
    /// Target table.
    pub table: Table,
    /// Projected columns; `["*"]` selects everything.
    pub columns: Vec<String>,
    /// Conjunctive filters.
    pub filters: Vec<Filter>,
    /// Optional ordering.
    pub order: Option<Order>,
    /// Optional row cap.
    pub limit: Option<u32>,
}

impl TableRequest {
    /// Start a request projecting the listed columns.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::request::{Table, TableRequest};
    ///
    /// let request = TableRequest::select(Table::Drafts, ["id", "draft_title"])
    ///     .with_order("created_utc", false)
    ///     .with_limit(100);
    /// assert_eq!(request.columns_clause(), "id,draft_title");
    /// assert_eq!(request.limit, Some(100));
    /// ```
    pub fn select<I, S>(table: Table, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        Self {
            table,
            columns: if columns.is_empty() {
                vec!["*".to_owned()]
            } else {
                columns
            },
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Start a request projecting every column.
    pub fn select_all(table: Table) -> Self {
        Self::select(table, ["*"])
    }

    /// Return a copy with one more filter appended.
    #[must_use]
    pub fn with_filter(mut self, column: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value,
        });
        self
    }

    /// Return a copy ordered by `column`.
    #[must_use]
    pub fn with_order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Return a copy capped at `limit` rows.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Comma-separated projection.
    pub fn columns_clause(&self) -> String {
        self.columns.join(",")
    }
}
