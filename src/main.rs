use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wiki_assistant::Result;
use wiki_assistant::assistant::build_assistant;
use wiki_assistant::commands::{
    ask_question, interactive_mode, search_content, show_recent_updates,
};
use wiki_assistant::config::{
    AnswerMode, Config, ConfigError, ENV_FILE_NAME, run_setup, show_config,
};
use wiki_assistant::confluence::ConfluenceClient;
use wiki_assistant::dashboard;

#[derive(Parser)]
#[command(name = "wiki-assistant")]
#[command(about = "Confluence AI Assistant - Ask questions about your Confluence documentation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Question to ask about Confluence content
    #[arg(short, long)]
    question: Option<String>,

    /// Search query for Confluence content
    #[arg(short, long)]
    search: Option<String>,

    /// Show recent updates summary
    #[arg(short, long)]
    recent: bool,

    /// Start interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Maximum context tokens (default: MAX_CONTEXT_TOKENS)
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Maximum search results (default: MAX_SEARCH_RESULTS)
    #[arg(long)]
    max_results: Option<usize>,

    /// Answer with a digest of the matching pages instead of calling the language model
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively create the .env file
    Setup,
    /// Configure settings, or show the effective configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Serve the web dashboard
    Dashboard {
        /// Address to listen on (default: DASHBOARD_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if matches!(
        cli.command,
        Some(Commands::Setup | Commands::Config { show: false })
    ) {
        init_tracing("warn");
        run_setup(Path::new(ENV_FILE_NAME))?;
        return Ok(ExitCode::SUCCESS);
    }

    let (mut config, mut problems) = Config::from_env_lenient();
    init_tracing(&config.log_level);

    if let Some(Commands::Config { show: true }) = cli.command {
        show_config(&config);
        if !problems.is_empty() {
            report_config_errors(&problems);
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mode = if cli.offline {
        AnswerMode::Offline
    } else {
        AnswerMode::Model
    };
    if let Some(max_results) = cli.max_results {
        config.retrieval.max_search_results = max_results;
    }
    if let Err(e) = config.validate(mode) {
        problems.insert(0, e);
    }
    if !problems.is_empty() {
        report_config_errors(&problems);
        return Ok(ExitCode::FAILURE);
    }

    if let Some(Commands::Dashboard { bind }) = cli.command {
        dashboard::serve(config, mode, bind).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if !(cli.interactive || cli.question.is_some() || cli.search.is_some() || cli.recent) {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    }

    let client = Arc::new(ConfluenceClient::new(&config.confluence)?);
    if !client.ping() {
        eprintln!("Error: Failed to connect to Confluence. Please check your credentials.");
        return Ok(ExitCode::FAILURE);
    }
    let assistant = build_assistant(Arc::clone(&client), &config, mode)?;

    let max_context_tokens = cli
        .max_tokens
        .unwrap_or(config.retrieval.max_context_tokens);
    let max_results = config.retrieval.max_search_results;

    if cli.interactive {
        interactive_mode(&client, assistant.as_ref(), max_context_tokens, max_results)?;
    } else if let Some(question) = &cli.question {
        ask_question(assistant.as_ref(), question, max_context_tokens);
    } else if let Some(query) = &cli.search {
        search_content(&client, query, max_results);
    } else if cli.recent {
        show_recent_updates(assistant.as_ref());
    }

    Ok(ExitCode::SUCCESS)
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report_config_errors(errors: &[ConfigError]) {
    eprintln!("Configuration Error:");
    for error in errors {
        match error {
            ConfigError::MissingRequired(keys) => {
                for key in keys {
                    eprintln!("  - {} is required", key);
                }
            }
            other => eprintln!("  - {}", other),
        }
    }
    eprintln!();
    eprintln!(
        "Please check your .env file or environment variables, or run 'wiki-assistant setup'."
    );
}
