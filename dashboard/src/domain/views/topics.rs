//! Topics page: insights tagged with one category, sorted by relevance or age.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Page, PageQuery};
use crate::domain::query_key::QueryKey;
use crate::domain::request::{FilterOp, FilterValue, Table, TableRequest};
use crate::domain::rows::Insight;

/// Rows shown per category.
pub const TOPICS_LIMIT: u32 = 50;

/// Topic categories offered as tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicCategory {
    /// Search engine optimisation.
    #[default]
    #[serde(rename = "SEO")]
    Seo,
    /// Pay-per-click advertising.
    #[serde(rename = "PPC")]
    Ppc,
    /// Content marketing.
    Content,
    /// Analytics and measurement.
    Analytics,
}

impl TopicCategory {
    /// Every category in tab order.
    pub const ALL: [Self; 4] = [Self::Seo, Self::Ppc, Self::Content, Self::Analytics];

    /// Label stored in the `topics` array column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seo => "SEO",
            Self::Ppc => "PPC",
            Self::Content => "Content",
            Self::Analytics => "Analytics",
        }
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a topic category from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTopicCategoryError {
    /// Text that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseTopicCategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid topic category: {} (expected SEO, PPC, Content or Analytics)",
            self.input
        )
    }
}

impl std::error::Error for ParseTopicCategoryError {}

impl FromStr for TopicCategory {
    type Err = ParseTopicCategoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ParseTopicCategoryError {
                input: value.to_owned(),
            })
    }
}

/// Sort field for a topic list.
///
/// Relevance sorts descending; recency sorts ascending by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicSort {
    /// Highest `rank_score` first.
    #[default]
    RankScore,
    /// Oldest `created_utc` first.
    CreatedTime,
}

impl TopicSort {
    /// Column the request orders by.
    pub const fn column(self) -> &'static str {
        match self {
            Self::RankScore => "rank_score",
            Self::CreatedTime => "created_utc",
        }
    }

    /// Whether the request orders ascending.
    pub const fn ascending(self) -> bool {
        matches!(self, Self::CreatedTime)
    }
}

impl fmt::Display for TopicSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankScore => f.write_str("rank_score"),
            Self::CreatedTime => f.write_str("created_time"),
        }
    }
}

/// Error returned when parsing a topic sort field from string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseTopicSortError;

impl fmt::Display for ParseTopicSortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid topic sort (expected rank_score or created_time)")
    }
}

impl std::error::Error for ParseTopicSortError {}

impl FromStr for TopicSort {
    type Err = ParseTopicSortError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rank_score" => Ok(Self::RankScore),
            "created_time" => Ok(Self::CreatedTime),
            _ => Err(ParseTopicSortError),
        }
    }
}

/// Parameters of the topics page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TopicsQuery {
    /// Category the insights must be tagged with.
    pub category: TopicCategory,
    /// Ordering of the list.
    pub sort: TopicSort,
}

impl PageQuery for TopicsQuery {
    type Row = Insight;

    fn page(&self) -> Page {
        Page::Topics
    }

    fn query_key(&self) -> QueryKey {
        QueryKey::new("topic")
            .with(self.category.as_str())
            .with(self.sort.to_string())
    }

    fn request(&self, _issued_at: DateTime<Utc>) -> TableRequest {
        TableRequest::select(
            Table::Insights,
            ["id", "title", "brief", "rank_score", "created_utc", "topics"],
        )
        .with_filter(
            "topics",
            FilterOp::Contains,
            FilterValue::List(vec![self.category.as_str().to_owned()]),
        )
        .with_order(self.sort.column(), self.sort.ascending())
        .with_limit(TOPICS_LIMIT)
    }
}
