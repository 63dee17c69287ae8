//! Answer generators.
//!
//! Both generators share retrieval, the "nothing found" fallbacks and error
//! conversion; they differ only in how answer text is produced from the
//! retrieved documents. Callers pick one at construction time and talk to it
//! through [`Assistant`].

pub mod model;
pub mod offline;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::{AnswerMode, Config};
use crate::confluence::{RawSearchResult, WikiSource};
use crate::retrieval::{EnrichedDocument, retrieve};

pub use model::ModelAssistant;
pub use offline::OfflineAssistant;

/// Pages fetched by [`Assistant::summarize_recent`] unless told otherwise
pub const DEFAULT_RECENT_LIMIT: usize = 20;
/// Pages listed in a recent-activity summary unless told otherwise
pub const DEFAULT_RECENT_PREVIEW: usize = 10;

/// Recent pages requested when retrieval comes back empty
const FALLBACK_RECENT_LIMIT: usize = 5;
/// Recent pages cited in the "nothing specific" answer
const FALLBACK_RECENT_SOURCES: usize = 3;

/// Coarse indicator of how much material backed an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// `High` when anything was retrieved, `Low` otherwise
    #[inline]
    pub fn for_retrieved(count: usize) -> Self {
        if count > 0 { Self::High } else { Self::Low }
    }
}

impl fmt::Display for Confidence {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub space: String,
}

impl From<&EnrichedDocument> for Source {
    #[inline]
    fn from(document: &EnrichedDocument) -> Self {
        Self {
            title: document.title.clone(),
            url: document.url.clone(),
            space: document.space.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<Source>,
    pub confidence: Confidence,
}

impl AnswerResult {
    #[inline]
    pub fn from_error(error: &anyhow::Error) -> Self {
        Self {
            answer: format!(
                "I encountered an error while processing your question: {}",
                error
            ),
            sources: Vec::new(),
            confidence: Confidence::Low,
        }
    }
}

/// One page in a recent-activity summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPage {
    pub title: String,
    pub space: String,
    pub last_modified: String,
    pub url: String,
}

impl From<&RawSearchResult> for RecentPage {
    #[inline]
    fn from(raw: &RawSearchResult) -> Self {
        Self {
            title: non_empty_or(raw.title(), "Untitled"),
            space: non_empty_or(raw.space_name(), "Unknown Space"),
            last_modified: non_empty_or(raw.last_modified(), "Unknown"),
            url: raw.web_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSummary {
    pub summary: String,
    pub pages: Vec<RecentPage>,
}

/// Question answering over a wiki.
///
/// Neither operation fails: problems are reported inside the returned value.
pub trait Assistant: Send + Sync {
    fn answer(&self, question: &str, max_context_tokens: usize) -> AnswerResult;

    /// Digest of the `limit` most recently modified pages, listing the first `preview`.
    fn summarize_recent(&self, limit: usize, preview: usize) -> RecentSummary;
}

/// Build the generator selected by `mode` on top of `source`.
#[inline]
pub fn build_assistant<S>(
    source: Arc<S>,
    config: &Config,
    mode: AnswerMode,
) -> anyhow::Result<Arc<dyn Assistant>>
where
    S: WikiSource + 'static,
{
    let assistant: Arc<dyn Assistant> = match mode {
        AnswerMode::Model => Arc::new(ModelAssistant::new(source, config)?),
        AnswerMode::Offline => Arc::new(OfflineAssistant::new(
            source,
            config.retrieval.max_search_results,
        )),
    };
    Ok(assistant)
}

/// Retrieve documents for `question` and hand them to `generate`.
///
/// Covers the no-results fallbacks and turns a generation failure into the
/// low-confidence error answer.
fn respond<S, F>(source: &S, question: &str, max_results: usize, generate: F) -> AnswerResult
where
    S: WikiSource + ?Sized,
    F: FnOnce(&[EnrichedDocument]) -> anyhow::Result<String>,
{
    info!("Searching for content related to: {}", question);
    let documents = retrieve(source, question, max_results);

    if documents.is_empty() {
        return no_results_answer(source, question);
    }

    match generate(&documents) {
        Ok(answer) => AnswerResult {
            answer,
            sources: documents.iter().map(Source::from).collect(),
            confidence: Confidence::for_retrieved(documents.len()),
        },
        Err(e) => {
            error!("Error answering question: {:#}", e);
            AnswerResult::from_error(&e)
        }
    }
}

fn no_results_answer<S>(source: &S, question: &str) -> AnswerResult
where
    S: WikiSource + ?Sized,
{
    let recent = source.list_recent(FALLBACK_RECENT_LIMIT);

    if recent.is_empty() {
        return AnswerResult {
            answer: format!(
                "I couldn't find any relevant information about '{}' in your Confluence \
                 documentation. This could be because:\n\n\
                 1. The information might not be documented yet\n\
                 2. It might be in a different space or page\n\
                 3. The search terms might need to be adjusted\n\n\
                 Try searching for different keywords or check if the information exists \
                 in your Confluence space.",
                question
            ),
            sources: Vec::new(),
            confidence: Confidence::Low,
        };
    }

    AnswerResult {
        answer: format!(
            "I couldn't find specific information about '{}' in your Confluence documentation. \
             However, I found some recent pages that might be relevant. You may want to check \
             your Confluence space for more specific information or try rephrasing your \
             question with different keywords.",
            question
        ),
        sources: recent
            .iter()
            .take(FALLBACK_RECENT_SOURCES)
            .map(|page| Source {
                title: non_empty_or(page.title(), "Untitled"),
                url: page.web_url(),
                space: page.space_name().to_string(),
            })
            .collect(),
        confidence: Confidence::Low,
    }
}

/// Fetch recent pages and hand the first `preview` of them to `render`.
fn summarize<S, F>(source: &S, limit: usize, preview: usize, render: F) -> RecentSummary
where
    S: WikiSource + ?Sized,
    F: FnOnce(&[RecentPage]) -> anyhow::Result<String>,
{
    let recent = source.list_recent(limit);
    if recent.is_empty() {
        return RecentSummary {
            summary: "No recent updates found.".to_string(),
            pages: Vec::new(),
        };
    }

    let pages: Vec<RecentPage> = recent.iter().take(preview).map(RecentPage::from).collect();

    match render(&pages) {
        Ok(summary) => RecentSummary { summary, pages },
        Err(e) => {
            error!("Error getting recent updates: {:#}", e);
            RecentSummary {
                summary: format!("Error retrieving recent updates: {}", e),
                pages: Vec::new(),
            }
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
