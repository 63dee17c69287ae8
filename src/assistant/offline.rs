use std::sync::Arc;

use super::{AnswerResult, Assistant, RecentPage, RecentSummary, respond, summarize};
use crate::confluence::WikiSource;
use crate::retrieval::EnrichedDocument;

/// Entries shown in a digest
const DIGEST_ENTRIES: usize = 5;
/// Characters of content shown per digest entry
const PREVIEW_CHARS: usize = 300;
/// Bullets shown in a recent-activity summary
const SUMMARY_BULLETS: usize = 5;

/// Answers rendered as a plain digest of the retrieved pages, no model involved.
pub struct OfflineAssistant<S: ?Sized> {
    source: Arc<S>,
    max_results: usize,
}

impl<S> OfflineAssistant<S>
where
    S: WikiSource + ?Sized,
{
    #[inline]
    pub fn new(source: Arc<S>, max_results: usize) -> Self {
        Self {
            source,
            max_results,
        }
    }
}

impl<S> Assistant for OfflineAssistant<S>
where
    S: WikiSource + ?Sized,
{
    /// The context budget does not apply; the digest has a fixed shape.
    #[inline]
    fn answer(&self, question: &str, _max_context_tokens: usize) -> AnswerResult {
        respond(
            self.source.as_ref(),
            question,
            self.max_results,
            |documents| Ok(render_digest(documents)),
        )
    }

    #[inline]
    fn summarize_recent(&self, limit: usize, preview: usize) -> RecentSummary {
        summarize(self.source.as_ref(), limit, preview, |pages| {
            Ok(render_recent(pages))
        })
    }
}

/// Numbered digest of the first few documents.
#[inline]
pub fn render_digest(documents: &[EnrichedDocument]) -> String {
    let mut lines = vec![
        format!(
            "Based on your Confluence documentation, I found {} relevant pages:",
            documents.len()
        ),
        String::new(),
    ];

    for (i, document) in documents.iter().take(DIGEST_ENTRIES).enumerate() {
        lines.push(format!(
            "{}. **{}** (in {})",
            i + 1,
            document.title,
            document.space
        ));
        lines.push(format!("   Last modified: {}", document.last_modified));
        lines.push(format!("   Preview: {}", preview(&document.content)));
        lines.push(String::new());
    }

    lines.push("You can click on the links below to view the full content.".to_string());
    lines.join("\n")
}

#[inline]
pub fn render_recent(pages: &[RecentPage]) -> String {
    let mut lines = vec![
        format!(
            "Found {} recent pages in your Confluence space:",
            pages.len()
        ),
        String::new(),
    ];

    lines.extend(
        pages
            .iter()
            .take(SUMMARY_BULLETS)
            .map(|page| format!("• {} (in {}) - {}", page.title, page.space, page.last_modified)),
    );

    if pages.len() > SUMMARY_BULLETS {
        lines.push(format!(
            "... and {} more pages",
            pages.len() - SUMMARY_BULLETS
        ));
    }

    lines.join("\n")
}

/// First 300 characters, with an ellipsis when anything was cut
fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
