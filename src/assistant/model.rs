use std::sync::Arc;

use anyhow::{Context as _, Result};
use itertools::Itertools;
use tracing::{debug, info};

use super::{AnswerResult, Assistant, RecentPage, RecentSummary, respond, summarize};
use crate::config::Config;
use crate::confluence::WikiSource;
use crate::context::{TokenCounter, assemble_context};
use crate::llm::{ChatClient, ChatMessage};
use crate::retrieval::EnrichedDocument;

/// Output cap for recent-activity summaries
const SUMMARY_MAX_TOKENS: u32 = 200;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on \
Confluence documentation. Use the provided context to answer the user's question accurately \
and comprehensively. If the context doesn't contain enough information to answer the question, \
say so clearly. Always cite the sources when possible by mentioning the page titles. Be concise \
but thorough in your responses.";

/// Answers written by a hosted chat model from a token-bounded context.
pub struct ModelAssistant<S: ?Sized> {
    source: Arc<S>,
    chat: ChatClient,
    counter: TokenCounter,
    max_results: usize,
    max_tokens: u32,
    temperature: f32,
}

impl<S> ModelAssistant<S>
where
    S: WikiSource + ?Sized,
{
    #[inline]
    pub fn new(source: Arc<S>, config: &Config) -> Result<Self> {
        let chat = ChatClient::new(&config.model).context("Failed to create model client")?;
        Self::with_chat_client(source, chat, config)
    }

    /// Use an already configured chat client
    #[inline]
    pub fn with_chat_client(source: Arc<S>, chat: ChatClient, config: &Config) -> Result<Self> {
        let counter = TokenCounter::for_model(chat.model())?;
        Ok(Self {
            source,
            chat,
            counter,
            max_results: config.retrieval.max_search_results,
            max_tokens: config.model.max_tokens,
            temperature: config.model.temperature,
        })
    }

    fn generate(
        &self,
        question: &str,
        documents: &[EnrichedDocument],
        max_context_tokens: usize,
    ) -> Result<String> {
        let context = assemble_context(documents, max_context_tokens, &self.counter);
        debug!(
            "Assembled context of {} tokens",
            self.counter.count(&context)
        );

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(&context, question)),
        ];

        info!("Generating answer using {}...", self.chat.model());
        self.chat
            .complete(&messages, self.max_tokens, self.temperature)
    }
}

impl<S> Assistant for ModelAssistant<S>
where
    S: WikiSource + ?Sized,
{
    #[inline]
    fn answer(&self, question: &str, max_context_tokens: usize) -> AnswerResult {
        respond(
            self.source.as_ref(),
            question,
            self.max_results,
            |documents| self.generate(question, documents, max_context_tokens),
        )
    }

    #[inline]
    fn summarize_recent(&self, limit: usize, preview: usize) -> RecentSummary {
        summarize(self.source.as_ref(), limit, preview, |pages| {
            let messages = [ChatMessage::user(summary_prompt(pages))];
            self.chat
                .complete(&messages, SUMMARY_MAX_TOKENS, self.temperature)
        })
    }
}

fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context from Confluence documentation:\n\n{}\n\nQuestion: {}\n\n\
         Please provide a comprehensive answer based on the context above. \
         If you reference specific information, mention which page it came from.",
        context, question
    )
}

fn summary_prompt(pages: &[RecentPage]) -> String {
    let listing = pages
        .iter()
        .map(|page| format!("- {} (in {}) - {}", page.title, page.space, page.last_modified))
        .join("\n");

    format!(
        "Based on these recent Confluence page updates, provide a brief summary of what's \
         been happening:\n\n{}\n\n\
         Please provide a concise summary of the recent activity and key themes.",
        listing
    )
}
