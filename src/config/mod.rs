// Configuration management module
// Settings are read from the environment (and `.env`) once at startup

pub mod interactive;
pub mod settings;


pub use interactive::{render_env_file, run_setup, show_config, write_env_file};
pub use settings::{
    AnswerMode, Config, ConfigError, ConfluenceConfig, ModelConfig, RetrievalConfig, mask_secret,
};

/// Name of the dotenv file the setup wizard writes
pub const ENV_FILE_NAME: &str = ".env";
