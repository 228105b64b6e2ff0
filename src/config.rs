use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Default character budget forwarded to summarization.
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 50_000;
/// Default ceiling for uploaded document bodies (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was already installed in the global cache.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the document navigator.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Model backend used for summarization and question answering.
    pub llm_provider: LlmProvider,
    /// Optional base URL override for the model backend.
    pub llm_base_url: Option<String>,
    /// Optional API key sent as a bearer token (OpenAI-compatible backends).
    pub llm_api_key: Option<String>,
    /// Model identifier used for summaries.
    pub llm_model: String,
    /// Optional model identifier used for answers; falls back to `llm_model`.
    pub llm_answer_model: Option<String>,
    /// Optional transport timeout applied by the HTTP client, in seconds.
    pub llm_timeout_secs: Option<u64>,
    /// Maximum characters forwarded to summarization before truncation.
    pub summary_max_chars: usize,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI (or compatible) chat completions API.
    OpenAI,
}

impl LlmProvider {
    /// Lowercase label used in logs and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let llm_provider = match load_env_optional("LLM_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".to_string()))?,
            None => LlmProvider::Ollama,
        };

        let summary_max_chars = parse_optional::<usize>("SUMMARY_MAX_CHARS")?
            .unwrap_or(DEFAULT_SUMMARY_MAX_CHARS);
        if summary_max_chars == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_MAX_CHARS".to_string()));
        }

        Ok(Self {
            llm_provider,
            llm_base_url: load_env_optional("LLM_BASE_URL"),
            llm_api_key: load_env_optional("LLM_API_KEY"),
            llm_model: load_env("LLM_MODEL")?,
            llm_answer_model: load_env_optional("LLM_ANSWER_MODEL"),
            llm_timeout_secs: parse_optional("LLM_TIMEOUT_SECS")?,
            summary_max_chars,
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Model used for answering questions.
    pub fn answer_model(&self) -> &str {
        self.llm_answer_model.as_deref().unwrap_or(&self.llm_model)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, if [`init_config`] has run.
pub fn get_config() -> Option<&'static Config> {
    CONFIG.get()
}

/// Load configuration from the environment (and `.env`) and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = config.llm_provider.label(),
        model = %config.llm_model,
        answer_model = %config.answer_model(),
        summary_max_chars = config.summary_max_chars,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    CONFIG.get().ok_or(ConfigError::AlreadyInitialized)
}
