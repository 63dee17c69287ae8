//! Walkthrough of the library API against a real Confluence instance.
//!
//! Reads the same settings as the CLI (environment or `.env`). Pass
//! `--offline` to skip the language model.
//!
//! ```sh
//! cargo run --example usage -- --offline
//! ```

use std::sync::Arc;

use anyhow::Context;
use wiki_assistant::Result;
use wiki_assistant::assistant::{
    Assistant, DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW, build_assistant,
};
use wiki_assistant::config::{AnswerMode, Config};
use wiki_assistant::confluence::ConfluenceClient;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let mode = if std::env::args().any(|arg| arg == "--offline") {
        AnswerMode::Offline
    } else {
        AnswerMode::Model
    };
    let config = Config::from_env()?;
    config.validate(mode)?;

    let client = Arc::new(ConfluenceClient::new(&config.confluence)?);
    if !client.ping() {
        println!("❌ Failed to connect to Confluence");
        return Ok(());
    }
    println!("✅ Connected to Confluence successfully!");

    let assistant = build_assistant(Arc::clone(&client), &config, mode)
        .context("Failed to create assistant")?;

    basic_question(assistant.as_ref(), config.retrieval.max_context_tokens);
    search(&client);
    recent_updates(assistant.as_ref());
    small_context(assistant.as_ref());

    Ok(())
}

fn basic_question(assistant: &dyn Assistant, max_context_tokens: usize) {
    println!("\n=== Basic Usage Example ===");

    let question = "What are the main features of our product?";
    println!("\nQuestion: {}", question);

    let result = assistant.answer(question, max_context_tokens);
    println!("\nAnswer: {}", result.answer);
    for source in &result.sources {
        println!("  • {} - {}", source.title, source.space);
    }
}

fn search(client: &ConfluenceClient) {
    println!("\n=== Search Content Example ===");

    let query = "API documentation";
    println!("Searching for: {}", query);

    let results = client.search(query, 5);
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    println!("Found {} results:", results.len());
    for (i, result) in results.iter().enumerate() {
        println!("\n{}. {}", i + 1, result.title());
        println!("   Space: {}", result.space_name());
        println!("   Type: {}", result.content_type());
    }
}

fn recent_updates(assistant: &dyn Assistant) {
    println!("\n=== Recent Updates Example ===");

    let recent = assistant.summarize_recent(DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW);
    println!("Recent Updates Summary:");
    println!("{}", recent.summary);

    if !recent.pages.is_empty() {
        println!("\nRecent Pages ({}):", recent.pages.len());
        for page in recent.pages.iter().take(5) {
            println!("  • {} - {}", page.title, page.space);
        }
    }
}

fn small_context(assistant: &dyn Assistant) {
    println!("\n=== Custom Context Budget Example ===");

    let question = "How do I get started?";
    let result = assistant.answer(question, 500);
    println!("Question: {}", question);
    println!("Answer (500 token context): {}", result.answer);
    println!("Confidence: {}", result.confidence);
}
