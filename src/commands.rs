use std::time::Duration;

use anyhow::Result;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::assistant::{
    AnswerResult, Assistant, DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW, RecentSummary,
};
use crate::confluence::{ConfluenceClient, RawSearchResult};

const RULE_WIDTH: usize = 50;
/// Pages listed under a recent summary
const RECENT_PAGES_SHOWN: usize = 10;

/// One line of input in interactive mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Search(String),
    Recent,
    Help,
    Quit,
    /// A command that needs an argument was given none
    Usage(&'static str),
    Empty,
}

impl ReplCommand {
    /// Parse a line. Keywords are case-insensitive; anything unrecognised is a question.
    #[inline]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(head, rest)| (head, rest.trim()));

        match head.to_lowercase().as_str() {
            "quit" | "exit" | "q" if rest.is_empty() => Self::Quit,
            "help" if rest.is_empty() => Self::Help,
            "recent" if rest.is_empty() => Self::Recent,
            "ask" if rest.is_empty() => Self::Usage("Please provide a question after 'ask'"),
            "ask" => Self::Ask(rest.to_string()),
            "search" if rest.is_empty() => {
                Self::Usage("Please provide a search query after 'search'")
            }
            "search" => Self::Search(rest.to_string()),
            _ => Self::Ask(line.to_string()),
        }
    }
}

/// Ask a question and print the answer with its sources
#[inline]
pub fn ask_question(assistant: &dyn Assistant, question: &str, max_context_tokens: usize) {
    let spinner = spinner("Thinking...");
    let result = assistant.answer(question, max_context_tokens);
    spinner.finish_and_clear();

    println!("{}", format_answer(question, &result));
}

/// Search the wiki directly and print the raw hits
#[inline]
pub fn search_content(client: &ConfluenceClient, query: &str, max_results: usize) {
    let spinner = spinner("Searching...");
    let results = client.search(query, max_results);
    spinner.finish_and_clear();

    println!("{}", format_search_results(query, &results));
}

#[inline]
pub fn show_recent_updates(assistant: &dyn Assistant) {
    let spinner = spinner("Collecting recent updates...");
    let summary = assistant.summarize_recent(DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW);
    spinner.finish_and_clear();

    println!("{}", format_recent(&summary));
}

/// Read-eval loop until the user quits or input closes
#[inline]
pub fn interactive_mode(
    client: &ConfluenceClient,
    assistant: &dyn Assistant,
    max_context_tokens: usize,
    max_results: usize,
) -> Result<()> {
    println!();
    println!("🤖 Confluence AI Assistant - Interactive Mode");
    println!("Type 'help' for commands, 'quit' to exit");
    println!("{}", "=".repeat(RULE_WIDTH));

    loop {
        println!();
        let line = match Input::<String>::new()
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                debug!("Input closed: {}", e);
                println!("Goodbye!");
                break;
            }
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Recent => show_recent_updates(assistant),
            ReplCommand::Ask(question) => ask_question(assistant, &question, max_context_tokens),
            ReplCommand::Search(query) => search_content(client, &query, max_results),
            ReplCommand::Usage(hint) => println!("{}", hint),
            ReplCommand::Empty => {}
        }
    }

    Ok(())
}

fn print_help() {
    println!();
    println!("Available commands:");
    println!("  ask <question>  - Ask a question about Confluence content");
    println!("  search <query>  - Search for content");
    println!("  recent          - Show recent updates");
    println!("  help            - Show this help");
    println!("  quit/exit/q     - Exit the program");
}

fn format_answer(question: &str, result: &AnswerResult) -> String {
    let mut lines = vec![
        String::new(),
        format!("Question: {}", question),
        "=".repeat(RULE_WIDTH),
        String::new(),
        "Answer:".to_string(),
        result.answer.clone(),
    ];

    if !result.sources.is_empty() {
        lines.push(String::new());
        lines.push("Sources:".to_string());
        for source in &result.sources {
            lines.push(format!("  • {} - {}", source.title, source.space));
            lines.push(format!("    {}", source.url));
        }
    }

    lines.push(String::new());
    lines.push(format!("Confidence: {}", result.confidence));
    lines.join("\n")
}

fn format_search_results(query: &str, results: &[RawSearchResult]) -> String {
    let mut lines = vec![
        String::new(),
        format!("Searching for: {}", query),
        "=".repeat(RULE_WIDTH),
    ];

    if results.is_empty() {
        lines.push("No results found.".to_string());
        return lines.join("\n");
    }

    lines.push(format!("Found {} results:", results.len()));
    lines.push(String::new());

    for (i, result) in results.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, or_default(result.title(), "Untitled")));
        lines.push(format!(
            "   Space: {}",
            or_default(result.space_name(), "Unknown")
        ));
        lines.push(format!("   Type: {}", result.content_type()));
        lines.push(format!(
            "   Last Modified: {}",
            or_default(result.last_modified(), "Unknown")
        ));

        let url = result.web_url();
        if !url.is_empty() {
            lines.push(format!("   URL: {}", url));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn format_recent(summary: &RecentSummary) -> String {
    let mut lines = vec![
        String::new(),
        "Recent Updates Summary".to_string(),
        "=".repeat(RULE_WIDTH),
        String::new(),
        "Summary:".to_string(),
        summary.summary.clone(),
    ];

    if !summary.pages.is_empty() {
        lines.push(String::new());
        lines.push("Recent Pages:".to_string());
        lines.extend(summary.pages.iter().take(RECENT_PAGES_SHOWN).map(|page| {
            format!(
                "  • {} - {} ({})",
                page.title, page.space, page.last_modified
            )
        }));
    }

    lines.join("\n")
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
