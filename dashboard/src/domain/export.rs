//! Markdown export for drafts.
//!
//! A draft becomes a Markdown document with YAML front matter carrying the
//! title, creation date and source, followed by the draft body.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::rows::Draft;

/// Source recorded when a draft does not name one.
pub const DEFAULT_SOURCE: &str = "reddit";

/// A rendered draft ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftDocument {
    /// File name derived from the draft title, ending in `.md`.
    pub file_name: String,
    /// Markdown contents, newline terminated.
    pub contents: String,
}

/// Render `draft` as a Markdown document.
///
/// `now` stands in for a missing creation time.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use dashboard::domain::export::export_draft;
/// use dashboard::domain::rows::Draft;
///
/// let now = Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap();
/// let draft = Draft {
///     id: "d-1".into(),
///     draft_title: Some("Reddit Ads 101".into()),
///     created_utc: None,
///     source: None,
///     brief: Some("Start small.".into()),
/// };
/// let document = export_draft(&draft, now);
/// assert_eq!(document.file_name, "reddit-ads-101.md");
/// assert!(document.contents.starts_with("---\ntitle: \"Reddit Ads 101\"\n"));
/// ```
pub fn export_draft(draft: &Draft, now: DateTime<Utc>) -> DraftDocument {
    let title = draft.draft_title.as_deref().unwrap_or_default();
    let date = draft
        .created_utc
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let source = draft.source.as_deref().unwrap_or(DEFAULT_SOURCE);
    let body = draft.brief.as_deref().unwrap_or_default();

    let contents = format!(
        "---\ntitle: \"{}\"\ndate: {date}\nsource: {source}\n---\n\n{body}\n",
        title.replace('"', "\\\"")
    );
    DraftDocument {
        file_name: file_name_for(draft.draft_title.as_deref()),
        contents,
    }
}

/// Render every draft, numbering repeated file names so none overwrites
/// another: the second `weekly-digest.md` becomes `weekly-digest-2.md`.
pub fn export_drafts(drafts: &[Draft], now: DateTime<Utc>) -> Vec<DraftDocument> {
    let mut taken = HashSet::with_capacity(drafts.len());
    drafts
        .iter()
        .map(|draft| {
            let mut document = export_draft(draft, now);
            document.file_name = claim_file_name(&mut taken, &document.file_name);
            document
        })
        .collect()
}

fn claim_file_name(taken: &mut HashSet<String>, file_name: &str) -> String {
    if taken.insert(file_name.to_owned()) {
        return file_name.to_owned();
    }
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    let mut counter = 2_u32;
    loop {
        let candidate = format!("{stem}-{counter}.md");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter = counter.saturating_add(1);
    }
}

fn file_name_for(title: Option<&str>) -> String {
    let stem = title.map(str::trim).filter(|title| !title.is_empty());
    let slug = stem
        .unwrap_or("draft")
        .split(|ch: char| ch.is_whitespace() || ch == '/' || ch == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    let slug = if slug.is_empty() || slug.chars().all(|ch| ch == '.') {
        "draft".to_owned()
    } else {
        slug
    };
    format!("{slug}.md")
}
