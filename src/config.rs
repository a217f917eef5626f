use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wikitree: WikitreeConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub wikipedia: WikipediaConfig,
    #[serde(default)]
    pub ner: NerConfig,
}

/// Application-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct WikitreeConfig {
    /// SQLite file holding all named sessions.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WikitreeConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
        }
    }
}

/// Default traversal bounds, overridable per invocation
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            depth: default_depth(),
        }
    }
}

/// MediaWiki API client settings
#[derive(Debug, Clone, Deserialize)]
pub struct WikipediaConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_cache_capacity(),
            max_retries: default_max_retries(),
        }
    }
}

/// Token-classification endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct NerConfig {
    #[serde(default = "default_ner_endpoint")]
    pub endpoint: String,
    /// Environment variable holding a bearer token; unset means anonymous requests.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ner_endpoint(),
            api_key_env: None,
            chunk_chars: default_chunk_chars(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl NerConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Resolve the bearer token from the configured environment variable.
    pub fn api_key(&self) -> Result<Option<String>> {
        match &self.api_key_env {
            None => Ok(None),
            Some(var) => std::env::var(var).map(Some).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                    var
                )
            }),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("wikitree.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_width() -> usize {
    2
}

fn default_depth() -> usize {
    2
}

fn default_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_user_agent() -> String {
    format!("wikitree/{} (relationship graph builder)", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    512
}

fn default_max_retries() -> usize {
    3
}

fn default_ner_endpoint() -> String {
    "https://api-inference.huggingface.co/models/dbmdz/bert-large-cased-finetuned-conll03-english"
        .to_string()
}

fn default_chunk_chars() -> usize {
    2000
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in WIKITREE_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (built-in defaults when absent)
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var("WIKITREE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Config::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a specific config file without consulting the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.traversal.width == 0 {
            anyhow::bail!("traversal.width must be greater than 0");
        }

        if self.ner.chunk_chars < 100 {
            anyhow::bail!("ner.chunk_chars must be at least 100");
        }

        if self.ner.endpoint.trim().is_empty() {
            anyhow::bail!("ner.endpoint must not be empty");
        }

        if self.wikipedia.api_url.trim().is_empty() {
            anyhow::bail!("wikipedia.api_url must not be empty");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.wikitree.db_path
    }
}
