use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Wiki error: {0}")]
    Wiki(#[from] confluence::WikiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod assistant;
pub mod commands;
pub mod config;
pub mod confluence;
pub mod context;
pub mod dashboard;
pub mod llm;
pub mod retrieval;

#[cfg(test)]
pub(crate) mod testing;
