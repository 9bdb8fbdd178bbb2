//! Command-line shell rendering page decisions as JSON.
//!
//! The shell owns no decision logic: it builds the page query from
//! arguments, lets the controller settle it, and serialises the resulting
//! view. `export-drafts` additionally writes each draft as Markdown.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::domain::export;
use crate::domain::query_cache::{FetchOptions, QueryCache};
use crate::domain::views::{
    DraftsQuery, ExplorerQuery, OverviewController, RenderDecision, TopicCategory, TopicSort,
    TopicsQuery, ViewController,
};

/// `dashboard` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dashboard",
    about = "Render insights dashboard pages from the hosted data API",
    version
)]
pub struct CliArgs {
    /// Page to render.
    #[command(subcommand)]
    pub command: PageCommand,
}

/// Page to render.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum PageCommand {
    /// Weekly activity, last pipeline run and top insights
    Overview,

    /// Insights for one topic category
    Topics {
        /// Category tab (SEO, PPC, Content, Analytics)
        #[arg(long, default_value_t = TopicCategory::Seo)]
        category: TopicCategory,
        /// Sort field (rank_score or created_time)
        #[arg(long, default_value_t = TopicSort::RankScore)]
        sort: TopicSort,
    },

    /// Search insights by title and source
    Explorer {
        /// Case-insensitive title substring; empty applies no filter
        #[arg(long, default_value = "")]
        search: String,
        /// Source filter such as `reddit` or `hn`
        #[arg(long)]
        source: Option<String>,
    },

    /// Most recent drafts
    Drafts,

    /// Write every listed draft as a Markdown file
    ExportDrafts {
        /// Directory receiving the files; created when missing
        #[arg(long = "out-dir", value_name = "path")]
        out_dir: PathBuf,
    },
}

/// Failures surfaced by the shell.
#[derive(Debug, Error)]
pub enum CliError {
    /// A view could not be serialised.
    #[error("serialise view: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Drafts could not be loaded for export.
    #[error("load drafts: {message}")]
    Drafts {
        /// Gateway failure detail.
        message: String,
    },
    /// An export file could not be written.
    #[error("write export to '{path}': {source}")]
    Export {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Summary printed after an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Directory the files were written to.
    pub directory: PathBuf,
    /// Written file names, in draft order.
    pub files: Vec<String>,
}

/// Run `command` against `cache` and return the JSON document to print.
///
/// # Errors
///
/// Returns [`CliError`] when serialisation fails, when drafts cannot be
/// loaded for export, or when an export file cannot be written.
pub async fn run(
    command: PageCommand,
    cache: &QueryCache,
    options: FetchOptions,
    now: DateTime<Utc>,
) -> Result<String, CliError> {
    match command {
        PageCommand::Overview => {
            let view = OverviewController::new(cache, options).settle().await;
            Ok(serde_json::to_string_pretty(&view)?)
        }
        PageCommand::Topics { category, sort } => {
            let mut controller = ViewController::new(cache.clone(), options);
            let view = controller.settle(&TopicsQuery { category, sort }).await;
            Ok(serde_json::to_string_pretty(&view)?)
        }
        PageCommand::Explorer { search, source } => {
            let mut controller = ViewController::new(cache.clone(), options);
            let query = ExplorerQuery::new(&search, source.as_deref());
            let view = controller.settle(&query).await;
            Ok(serde_json::to_string_pretty(&view)?)
        }
        PageCommand::Drafts => {
            let mut controller = ViewController::new(cache.clone(), options);
            let view = controller.settle(&DraftsQuery).await;
            Ok(serde_json::to_string_pretty(&view)?)
        }
        PageCommand::ExportDrafts { out_dir } => {
            let summary = export_drafts(cache, options, now, &out_dir).await?;
            Ok(serde_json::to_string_pretty(&summary)?)
        }
    }
}

async fn export_drafts(
    cache: &QueryCache,
    options: FetchOptions,
    now: DateTime<Utc>,
    out_dir: &Path,
) -> Result<ExportSummary, CliError> {
    let mut controller = ViewController::new(cache.clone(), options);
    let view = controller.settle(&DraftsQuery).await;
    let drafts = match view.decision {
        RenderDecision::Populated(drafts) => drafts,
        RenderDecision::Empty { .. } => Default::default(),
        RenderDecision::Error(notice) => {
            return Err(CliError::Drafts {
                message: notice.message,
            });
        }
        RenderDecision::Loading => {
            return Err(CliError::Drafts {
                message: "drafts did not settle".to_owned(),
            });
        }
    };

    let export_error = |source: io::Error| CliError::Export {
        path: out_dir.to_path_buf(),
        source,
    };
    Dir::create_ambient_dir_all(out_dir, ambient_authority()).map_err(export_error)?;
    let directory = Dir::open_ambient_dir(out_dir, ambient_authority()).map_err(export_error)?;

    let documents = export::export_drafts(&drafts, now);
    let mut files = Vec::with_capacity(documents.len());
    for document in documents {
        directory
            .write(&document.file_name, document.contents.as_bytes())
            .map_err(|source| CliError::Export {
                path: out_dir.join(&document.file_name),
                source,
            })?;
        files.push(document.file_name);
    }
    info!(directory = %out_dir.display(), count = files.len(), "exported drafts");
    Ok(ExportSummary {
        directory: out_dir.to_path_buf(),
        files,
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI parsing and command execution.

    use std::sync::Arc;

    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;
    use crate::domain::query_cache::DEFAULT_RETENTION;
    use crate::test_support::cap_fs::{list_file_names, read_file_to_string};
    use crate::test_support::gateway::{ScriptStep, ScriptedGateway};
    use crate::test_support::timing::{ImmediateSleeper, MutableClock};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    fn cache(steps: Vec<ScriptStep>, now: DateTime<Utc>) -> QueryCache {
        QueryCache::with_sleeper(
            Arc::new(ScriptedGateway::new(steps)),
            Arc::new(MutableClock::new(now)),
            Arc::new(ImmediateSleeper),
            DEFAULT_RETENTION,
        )
    }

    fn no_retries() -> FetchOptions {
        FetchOptions {
            retry_count: 0,
            ..FetchOptions::default()
        }
    }

    #[rstest]
    fn topics_arguments_parse_into_typed_values() {
        let args = CliArgs::try_parse_from([
            "dashboard",
            "topics",
            "--category",
            "ppc",
            "--sort",
            "created_time",
        ])
        .expect("arguments parse");
        assert_eq!(
            args.command,
            PageCommand::Topics {
                category: TopicCategory::Ppc,
                sort: TopicSort::CreatedTime,
            }
        );
    }

    #[rstest]
    fn unknown_sort_is_rejected() {
        let result = CliArgs::try_parse_from(["dashboard", "topics", "--sort", "newest"]);
        assert!(result.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn explorer_prints_tagged_decision(now: DateTime<Utc>) {
        let cache = cache(vec![ScriptStep::rows(json!([]))], now);
        let output = run(
            PageCommand::Explorer {
                search: "widget".to_owned(),
                source: None,
            },
            &cache,
            no_retries(),
            now,
        )
        .await
        .expect("command runs");

        let value: Value = serde_json::from_str(&output).expect("output is JSON");
        assert_eq!(
            value.get("decision"),
            Some(&json!({ "state": "empty", "detail": { "message": "No results." } }))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn export_writes_one_file_per_draft(now: DateTime<Utc>) {
        let cache = cache(
            vec![ScriptStep::rows(json!([
                { "id": "d-1", "draft_title": "Weekly SEO digest", "brief": "Body." },
                { "id": "d-2", "draft_title": null, "source": "hn" }
            ]))],
            now,
        );
        let temp = TempDir::new().expect("temp dir");
        let out_dir = temp.path().join("exports");

        let output = run(
            PageCommand::ExportDrafts {
                out_dir: out_dir.clone(),
            },
            &cache,
            no_retries(),
            now,
        )
        .await
        .expect("export runs");

        let summary: Value = serde_json::from_str(&output).expect("output is JSON");
        assert_eq!(
            summary.get("files"),
            Some(&json!(["weekly-seo-digest.md", "draft.md"]))
        );
        assert_eq!(
            list_file_names(&out_dir).expect("list exports"),
            vec!["draft.md".to_owned(), "weekly-seo-digest.md".to_owned()]
        );
        let contents = read_file_to_string(&out_dir, "draft.md").expect("read export");
        assert!(contents.contains("source: hn\n"));
    }

    #[rstest]
    #[tokio::test]
    async fn export_keeps_drafts_with_the_same_title(now: DateTime<Utc>) {
        let cache = cache(
            vec![ScriptStep::rows(json!([
                { "id": "d-1", "draft_title": "Weekly digest", "brief": "FIRST" },
                { "id": "d-2", "draft_title": "Weekly digest", "brief": "SECOND" }
            ]))],
            now,
        );
        let temp = TempDir::new().expect("temp dir");

        let output = run(
            PageCommand::ExportDrafts {
                out_dir: temp.path().to_path_buf(),
            },
            &cache,
            no_retries(),
            now,
        )
        .await
        .expect("export runs");

        let summary: Value = serde_json::from_str(&output).expect("output is JSON");
        assert_eq!(
            summary.get("files"),
            Some(&json!(["weekly-digest.md", "weekly-digest-2.md"]))
        );
        assert_eq!(
            list_file_names(temp.path()).expect("list exports"),
            vec!["weekly-digest-2.md".to_owned(), "weekly-digest.md".to_owned()]
        );
        let first = read_file_to_string(temp.path(), "weekly-digest.md").expect("read first");
        let second = read_file_to_string(temp.path(), "weekly-digest-2.md").expect("read second");
        assert!(first.ends_with("FIRST\n"));
        assert!(second.ends_with("SECOND\n"));
    }

    #[rstest]
    #[tokio::test]
    async fn export_reports_gateway_errors(now: DateTime<Utc>) {
        let cache = cache(vec![ScriptStep::remote_error("Database error")], now);
        let temp = TempDir::new().expect("temp dir");

        let error = run(
            PageCommand::ExportDrafts {
                out_dir: temp.path().to_path_buf(),
            },
            &cache,
            no_retries(),
            now,
        )
        .await
        .expect_err("export must fail");

        assert!(matches!(error, CliError::Drafts { ref message } if message == "Database error"));
    }
}
