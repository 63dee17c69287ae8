
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password};

use super::settings::{Config, ConfigError, ConfluenceConfig, mask_secret};
use crate::confluence::ConfluenceClient;

/// Walk through every setting, test the wiki connection, and write `env_path`.
#[inline]
pub fn run_setup(env_path: &Path) -> Result<()> {
    eprintln!("{}", style("🚀 Wiki Assistant Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config();

    eprintln!("{}", style("Confluence Configuration").bold().yellow());
    eprintln!("Point the assistant at your Confluence site and API token.");
    eprintln!();
    configure_confluence(&mut config.confluence)?;

    eprintln!();
    eprintln!("{}", style("Language Model Configuration").bold().yellow());
    eprintln!("Leave the API key empty to use the offline answer mode only.");
    eprintln!();
    configure_model(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    match ConfluenceClient::new(&config.confluence) {
        Ok(client) if client.ping() => {
            eprintln!("{}", style("✓ Confluence connection successful!").green());
        }
        _ => {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Confluence").yellow()
            );
            eprintln!("You can continue, but check your URL and API token before asking questions.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt(format!("Write settings to {}?", env_path.display()))
        .default(true)
        .interact()?
    {
        write_env_file(env_path, &config).context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Run {} to start asking questions.",
            style("wiki-assistant --interactive").cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Confluence Settings:").bold().yellow());
    eprintln!("  URL: {}", style(display_or_unset(&config.confluence.url)).cyan());
    eprintln!(
        "  Username: {}",
        style(display_or_unset(&config.confluence.username)).cyan()
    );
    eprintln!(
        "  API Token: {}",
        style(mask_secret(&config.confluence.api_token)).cyan()
    );
    eprintln!(
        "  Space: {}",
        style(config.confluence.space_key.as_deref().unwrap_or("(all spaces)")).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Model Settings:").bold().yellow());
    eprintln!("  API Key: {}", style(mask_secret(&config.model.api_key)).cyan());
    eprintln!("  Endpoint: {}", style(&config.model.base_url).cyan());
    eprintln!("  Model: {}", style(&config.model.model).cyan());
    eprintln!("  Max Tokens: {}", style(config.model.max_tokens).cyan());
    eprintln!("  Temperature: {}", style(config.model.temperature).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!(
        "  Max Search Results: {}",
        style(config.retrieval.max_search_results).cyan()
    );
    eprintln!(
        "  Max Context Tokens: {}",
        style(config.retrieval.max_context_tokens).cyan()
    );
    eprintln!(
        "  Chunk Size / Overlap: {} / {}",
        style(config.retrieval.chunk_size).cyan(),
        style(config.retrieval.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!("  Log Level: {}", style(&config.log_level).cyan());
    eprintln!("  Dashboard: {}", style(&config.dashboard_bind).cyan());
}

/// Render settings as dotenv lines. Empty values are left out.
#[inline]
pub fn render_env_file(config: &Config) -> String {
    let mut content = String::from("# Generated by wiki-assistant setup\n");
    for (key, value) in config.env_entries() {
        if value.is_empty() {
            continue;
        }
        content.push_str(key);
        content.push('=');
        content.push_str(&quote_env_value(&value));
        content.push('\n');
    }
    content
}

#[inline]
pub fn write_env_file(path: &Path, config: &Config) -> Result<()> {
    fs::write(path, render_env_file(config))
        .with_context(|| format!("Failed to write env file: {}", path.display()))
}

fn quote_env_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-.:/@+,".contains(c));
    if plain {
        value.to_string()
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{}\"", escaped)
    }
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn load_existing_config() -> Config {
    let (config, problems) = Config::from_env_lenient();
    for problem in &problems {
        eprintln!("{}", style(format!("Ignoring {}; using the default.", problem)).yellow());
    }
    if !config.confluence.url.is_empty() {
        eprintln!("{}", style("Found existing configuration.").green());
    }
    config
}

fn configure_confluence(confluence: &mut ConfluenceConfig) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("Confluence URL (e.g. https://your-domain.atlassian.net)")
        .with_initial_text(confluence.url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let candidate = ConfluenceConfig {
                url: input.trim().to_string(),
                ..ConfluenceConfig::default()
            };
            candidate.validate()
        })
        .interact_text()?;

    let username: String = Input::new()
        .with_prompt("Confluence username (email)")
        .with_initial_text(confluence.username.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Username cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_token = prompt_secret("Confluence API token", &confluence.api_token, false)?;

    let space_key: String = Input::new()
        .with_prompt("Restrict to space key (empty for all spaces)")
        .with_initial_text(confluence.space_key.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    confluence.url = url.trim().to_string();
    confluence.username = username.trim().to_string();
    confluence.api_token = api_token;
    confluence.space_key = Some(space_key.trim().to_string()).filter(|key| !key.is_empty());

    Ok(())
}

fn configure_model(config: &mut Config) -> Result<()> {
    config.model.api_key = prompt_secret("OpenAI API key", &config.model.api_key, true)?;

    let model: String = Input::new()
        .with_prompt("Model")
        .default(config.model.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let max_results: usize = Input::new()
        .with_prompt("Maximum search results per question")
        .default(config.retrieval.max_search_results)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let max_context: usize = Input::new()
        .with_prompt("Maximum context tokens")
        .default(config.retrieval.max_context_tokens)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.model.model = model.trim().to_string();
    config.retrieval.max_search_results = max_results;
    config.retrieval.max_context_tokens = max_context;

    Ok(())
}

fn prompt_secret(prompt: &str, existing: &str, optional: bool) -> Result<String> {
    if !existing.is_empty()
        && Confirm::new()
            .with_prompt(format!("Keep existing {} ({})?", prompt, mask_secret(existing)))
            .default(true)
            .interact()?
    {
        return Ok(existing.to_string());
    }

    let secret = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(optional)
        .interact()?;
    Ok(secret.trim().to_string())
}
