//! Passive row types decoded from gateway records.
//!
//! Rows are transport records: the dashboard never mutates them and never
//! joins them locally. Every field except the identifier is optional because
//! each page projects a different column subset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ranked insight derived from community posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Stable identifier.
    pub id: String,
    /// Headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Short summary.
    #[serde(default)]
    pub brief: Option<String>,
    /// Link back to the source discussion.
    #[serde(default)]
    pub permalink: Option<String>,
    /// Relevance score assigned by the pipeline.
    #[serde(default)]
    pub rank_score: Option<f64>,
    /// Creation instant.
    #[serde(default)]
    pub created_utc: Option<DateTime<Utc>>,
    /// Topic categories the insight belongs to.
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    /// Originating source (`reddit`, `hn`, ...).
    #[serde(default)]
    pub source: Option<String>,
}

/// Minimal insight projection used for the weekly activity sparkline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightActivity {
    /// Stable identifier.
    pub id: String,
    /// Creation instant.
    pub created_utc: DateTime<Utc>,
}

/// An article draft generated from an insight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Stable identifier.
    pub id: String,
    /// Draft headline.
    #[serde(default)]
    pub draft_title: Option<String>,
    /// Creation instant.
    #[serde(default)]
    pub created_utc: Option<DateTime<Utc>>,
    /// Originating source.
    #[serde(default)]
    pub source: Option<String>,
    /// Draft body.
    #[serde(default)]
    pub brief: Option<String>,
}

/// Bookkeeping row written by each pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Run status such as `completed` or `failed`.
    #[serde(default)]
    pub status: Option<String>,
    /// Instant the run was recorded.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
