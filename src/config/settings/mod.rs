
use std::env;

use thiserror::Error;
use url::Url;

pub const CONFLUENCE_URL: &str = "CONFLUENCE_URL";
pub const CONFLUENCE_USERNAME: &str = "CONFLUENCE_USERNAME";
pub const CONFLUENCE_API_TOKEN: &str = "CONFLUENCE_API_TOKEN";
pub const CONFLUENCE_SPACE_KEY: &str = "CONFLUENCE_SPACE_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const OPENAI_MAX_TOKENS: &str = "OPENAI_MAX_TOKENS";
pub const OPENAI_TEMPERATURE: &str = "OPENAI_TEMPERATURE";
pub const MAX_SEARCH_RESULTS: &str = "MAX_SEARCH_RESULTS";
pub const MAX_CONTEXT_TOKENS: &str = "MAX_CONTEXT_TOKENS";
pub const CHUNK_SIZE: &str = "CHUNK_SIZE";
pub const CHUNK_OVERLAP: &str = "CHUNK_OVERLAP";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const DASHBOARD_BIND: &str = "DASHBOARD_BIND";

/// Which answer generator the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Answers are written by the hosted language model.
    Model,
    /// Answers are a templated digest of the retrieved pages.
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub confluence: ConfluenceConfig,
    pub model: ModelConfig,
    pub retrieval: RetrievalConfig,
    pub log_level: String,
    pub dashboard_bind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfluenceConfig {
    pub url: String,
    pub username: String,
    pub api_token: String,
    pub space_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub max_search_results: usize,
    pub max_context_tokens: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Invalid URL for {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
}

impl Default for ConfluenceConfig {
    #[inline]
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            api_token: String::new(),
            space_key: None,
        }
    }
}

impl Default for ModelConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.3,
        }
    }
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_search_results: 5,
            max_context_tokens: 2000,
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            confluence: ConfluenceConfig::default(),
            model: ModelConfig::default(),
            retrieval: RetrievalConfig::default(),
            log_level: "info".to_string(),
            dashboard_bind: "127.0.0.1:8501".to_string(),
        }
    }
}

impl Config {
    /// Load settings from the process environment, after reading `.env` if one exists.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        let (config, problems) = Self::from_env_lenient();
        first_problem_or(config, problems)
    }

    /// Like [`Config::from_env`], but unparsable values fall back to their
    /// defaults and are returned alongside the config.
    #[inline]
    pub fn from_env_lenient() -> (Self, Vec<ConfigError>) {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup_lenient(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config, problems) = Self::from_lookup_lenient(lookup);
        first_problem_or(config, problems)
    }

    /// Build a config from `lookup`, keeping every value that parses.
    ///
    /// Each unparsable number is reported as [`ConfigError::InvalidValue`]
    /// and replaced by its default.
    #[inline]
    pub fn from_lookup_lenient<F>(lookup: F) -> (Self, Vec<ConfigError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        let mut problems = Vec::new();

        let config = Self {
            confluence: ConfluenceConfig {
                url: get(CONFLUENCE_URL).unwrap_or_default(),
                username: get(CONFLUENCE_USERNAME).unwrap_or_default(),
                api_token: get(CONFLUENCE_API_TOKEN).unwrap_or_default(),
                space_key: get(CONFLUENCE_SPACE_KEY),
            },
            model: ModelConfig {
                api_key: get(OPENAI_API_KEY).unwrap_or_default(),
                base_url: get(OPENAI_BASE_URL).unwrap_or(defaults.model.base_url),
                model: get(OPENAI_MODEL).unwrap_or(defaults.model.model),
                max_tokens: parse_or(
                    OPENAI_MAX_TOKENS,
                    get(OPENAI_MAX_TOKENS),
                    defaults.model.max_tokens,
                    &mut problems,
                ),
                temperature: parse_or(
                    OPENAI_TEMPERATURE,
                    get(OPENAI_TEMPERATURE),
                    defaults.model.temperature,
                    &mut problems,
                ),
            },
            retrieval: RetrievalConfig {
                max_search_results: parse_or(
                    MAX_SEARCH_RESULTS,
                    get(MAX_SEARCH_RESULTS),
                    defaults.retrieval.max_search_results,
                    &mut problems,
                ),
                max_context_tokens: parse_or(
                    MAX_CONTEXT_TOKENS,
                    get(MAX_CONTEXT_TOKENS),
                    defaults.retrieval.max_context_tokens,
                    &mut problems,
                ),
                chunk_size: parse_or(
                    CHUNK_SIZE,
                    get(CHUNK_SIZE),
                    defaults.retrieval.chunk_size,
                    &mut problems,
                ),
                chunk_overlap: parse_or(
                    CHUNK_OVERLAP,
                    get(CHUNK_OVERLAP),
                    defaults.retrieval.chunk_overlap,
                    &mut problems,
                ),
            },
            log_level: get(LOG_LEVEL)
                .map(|level| level.to_lowercase())
                .unwrap_or(defaults.log_level),
            dashboard_bind: get(DASHBOARD_BIND).unwrap_or(defaults.dashboard_bind),
        };

        (config, problems)
    }

    /// Required settings that are still blank for the given mode, in declaration order.
    #[inline]
    pub fn missing_required(&self, mode: AnswerMode) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.confluence.url.is_empty() {
            missing.push(CONFLUENCE_URL);
        }
        if self.confluence.username.is_empty() {
            missing.push(CONFLUENCE_USERNAME);
        }
        if self.confluence.api_token.is_empty() {
            missing.push(CONFLUENCE_API_TOKEN);
        }
        if mode == AnswerMode::Model && self.model.api_key.is_empty() {
            missing.push(OPENAI_API_KEY);
        }
        missing
    }

    #[inline]
    pub fn validate(&self, mode: AnswerMode) -> Result<(), ConfigError> {
        let missing = self.missing_required(mode);
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        self.confluence.validate()?;
        if mode == AnswerMode::Model {
            self.model.validate()?;
        }
        self.retrieval.validate()?;

        Ok(())
    }

    /// Settings as `KEY=value` pairs, in the order a `.env` file lists them.
    #[inline]
    pub fn env_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (CONFLUENCE_URL, self.confluence.url.clone()),
            (CONFLUENCE_USERNAME, self.confluence.username.clone()),
            (CONFLUENCE_API_TOKEN, self.confluence.api_token.clone()),
            (
                CONFLUENCE_SPACE_KEY,
                self.confluence.space_key.clone().unwrap_or_default(),
            ),
            (OPENAI_API_KEY, self.model.api_key.clone()),
            (OPENAI_BASE_URL, self.model.base_url.clone()),
            (OPENAI_MODEL, self.model.model.clone()),
            (OPENAI_MAX_TOKENS, self.model.max_tokens.to_string()),
            (OPENAI_TEMPERATURE, self.model.temperature.to_string()),
            (
                MAX_SEARCH_RESULTS,
                self.retrieval.max_search_results.to_string(),
            ),
            (
                MAX_CONTEXT_TOKENS,
                self.retrieval.max_context_tokens.to_string(),
            ),
            (CHUNK_SIZE, self.retrieval.chunk_size.to_string()),
            (CHUNK_OVERLAP, self.retrieval.chunk_overlap.to_string()),
            (LOG_LEVEL, self.log_level.clone()),
            (DASHBOARD_BIND, self.dashboard_bind.clone()),
        ]
    }
}

impl ConfluenceConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url(CONFLUENCE_URL, &self.url)?;
        Ok(())
    }

    /// Base URL with any trailing slash removed.
    #[inline]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl ModelConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url(OPENAI_BASE_URL, &self.base_url)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: OPENAI_MODEL,
                value: self.model.clone(),
            });
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ZeroLimit(OPENAI_MAX_TOKENS));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        Ok(())
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_search_results == 0 {
            return Err(ConfigError::ZeroLimit(MAX_SEARCH_RESULTS));
        }

        if self.max_context_tokens == 0 {
            return Err(ConfigError::ZeroLimit(MAX_CONTEXT_TOKENS));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroLimit(CHUNK_SIZE));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }

        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    problems: &mut Vec<ConfigError>,
) -> T {
    let Some(value) = raw else {
        return default;
    };
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            problems.push(ConfigError::InvalidValue { key, value });
            default
        }
    }
}

fn first_problem_or(config: Config, problems: Vec<ConfigError>) -> Result<Config, ConfigError> {
    match problems.into_iter().next() {
        Some(problem) => Err(problem),
        None => Ok(config),
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            key,
            value: value.to_string(),
        });
    }

    Ok(url)
}

/// Mask a secret for display, keeping only the last four characters.
#[inline]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(8), tail)
}
