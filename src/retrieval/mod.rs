#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::LazyLock;

use fancy_regex::Regex;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::confluence::{RawSearchResult, WikiSource, extract_text};

/// Number of keyword searches issued per question
pub const MAX_KEYWORDS: usize = 3;

static KEYWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{4,}\b").expect("keyword pattern is valid"));

/// A search hit reduced to plain text, ready for prompting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDocument {
    pub id: String,
    pub title: String,
    pub url: String,
    pub space: String,
    /// Plain text extracted from the storage body
    pub content: String,
    pub last_modified: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl EnrichedDocument {
    #[inline]
    pub fn from_raw(raw: &RawSearchResult, content: String) -> Self {
        Self {
            id: raw.id.clone(),
            title: raw.title().to_string(),
            url: raw.web_url(),
            space: raw.space_name().to_string(),
            content,
            last_modified: raw.last_modified().to_string(),
            content_type: raw.content_type().to_string(),
        }
    }
}

/// Find the pages most likely to answer `question`.
///
/// Runs a full-text search, then one search per keyword asking for
/// `max_results / 2` hits (never fewer than one), and only if both come back
/// empty falls back to recently modified pages. Hits are merged in
/// that order, deduplicated by id, capped at `max_results`, and enriched with
/// their plain-text body. Pages whose text comes out empty are dropped.
#[inline]
pub fn retrieve<S>(source: &S, question: &str, max_results: usize) -> Vec<EnrichedDocument>
where
    S: WikiSource + ?Sized,
{
    let candidates = gather_candidates(source, question, max_results);
    let unique = dedupe_by_id(candidates);
    debug!("{} unique candidates for question", unique.len());

    unique
        .into_iter()
        .take(max_results)
        .filter_map(|candidate| enrich(source, candidate))
        .collect()
}

/// Lowercased words of four or more characters, first occurrences only
#[inline]
pub fn extract_keywords(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    KEYWORD_PATTERN
        .find_iter(&lowered)
        .filter_map(Result::ok)
        .map(|found| found.as_str().to_string())
        .unique()
        .take(MAX_KEYWORDS)
        .collect()
}

fn gather_candidates<S>(source: &S, question: &str, max_results: usize) -> Vec<RawSearchResult>
where
    S: WikiSource + ?Sized,
{
    let mut candidates = source.search(question, max_results);

    let keyword_limit = (max_results / 2).max(1);
    for keyword in extract_keywords(question) {
        candidates.extend(source.search(&keyword, keyword_limit));
    }

    if candidates.is_empty() {
        info!("No search results found, trying recent pages...");
        candidates = source.list_recent(max_results);
    }

    candidates
}

/// Keep the first occurrence of every id; results without an id are dropped
fn dedupe_by_id(candidates: Vec<RawSearchResult>) -> Vec<RawSearchResult> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| !candidate.id.is_empty() && seen.insert(candidate.id.clone()))
        .collect()
}

fn enrich<S>(source: &S, candidate: RawSearchResult) -> Option<EnrichedDocument>
where
    S: WikiSource + ?Sized,
{
    let document = if candidate.has_body() {
        candidate
    } else {
        source.get_document(&candidate.id).unwrap_or(candidate)
    };

    let content = extract_text(document.storage_markup());
    if content.is_empty() {
        debug!("Skipping '{}' ({}): no text content", document.title(), document.id);
        return None;
    }

    Some(EnrichedDocument::from_raw(&document, content))
}
