
use anyhow::{Context as _, Result};
use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::retrieval::EnrichedDocument;

/// Separator placed between rendered documents
const BLOCK_SEPARATOR: &str = "\n";

/// Token counter using tiktoken-rs BPE vocabularies.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    /// Counter for the given model's vocabulary, `cl100k_base` if the model is unknown.
    #[inline]
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                debug!("No tokenizer registered for {}, using cl100k_base", model);
                tiktoken_rs::cl100k_base().context("Failed to load cl100k_base vocabulary")?
            }
        };
        Ok(Self { bpe })
    }

    #[inline]
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish_non_exhaustive()
    }
}

/// Render one document the way it appears in the prompt
#[inline]
pub fn render_document(document: &EnrichedDocument) -> String {
    format!(
        "\nTitle: {}\nSpace: {}\nURL: {}\nLast Modified: {}\n\nContent:\n{}\n\n---\n",
        document.title, document.space, document.url, document.last_modified, document.content
    )
}

/// Concatenate rendered documents in order while the whole block fits in `max_tokens`.
///
/// Stops at the first document that would overflow; documents are never cut
/// in half, so the result can be empty when the first one is already too big.
#[inline]
pub fn assemble_context(
    documents: &[EnrichedDocument],
    max_tokens: usize,
    counter: &TokenCounter,
) -> String {
    let mut context = String::new();
    let mut included = 0;

    for document in documents {
        let block = render_document(document);
        let candidate = if context.is_empty() {
            block
        } else {
            format!("{}{}{}", context, BLOCK_SEPARATOR, block)
        };

        if counter.count(&candidate) > max_tokens {
            debug!(
                "Context budget of {} tokens reached after {} of {} documents",
                max_tokens,
                included,
                documents.len()
            );
            break;
        }

        context = candidate;
        included += 1;
    }

    context
}
