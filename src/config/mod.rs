mod env_manager;

use crate::error::{IntrospectError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use env_manager::{get_env_value, ApiKeys};

/// Main configuration struct for the application
///
/// Holds API credentials, upstream endpoints, server settings, timeouts and
/// the limits applied to chat and summary requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub API token for authenticated requests
    pub github_token: Option<String>,
    /// API keys for the language model and speech services
    pub api_keys: ApiKeys,
    /// Base URLs of the upstream APIs
    pub endpoints: Endpoints,
    /// HTTP server and storage settings
    pub server: ServerConfig,
    /// Per-request timeouts for outbound calls
    pub timeouts: Timeouts,
    /// Limits on chat and summary inputs
    pub limits: Limits,
    /// Rate limit settings for outbound APIs
    pub rate_limits: RateLimits,
}

/// Base URLs for the upstream services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// GitHub REST API root
    pub github_api: String,
    /// Gemini models root (`.../v1beta/models`)
    pub gemini_api: String,
    /// Model used for every generateContent call
    pub gemini_model: String,
    /// ElevenLabs API root
    pub elevenlabs_api: String,
    /// ElevenLabs voice used for replies
    pub elevenlabs_voice_id: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server binds to
    pub bind_addr: String,
    /// SQLite database file holding cached reports
    pub database_path: PathBuf,
    /// Default log level when `RUST_LOG` is not set
    pub log_level: String,
}

/// Timeouts for outbound requests, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// GitHub requests
    pub github_secs: u64,
    /// Language model requests
    pub llm_secs: u64,
    /// Text-to-speech requests
    pub speech_secs: u64,
}

/// Limits on chat and summary inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of files that can be attached to one chat turn
    pub max_chat_files: usize,
    /// Characters of each file kept in a chat prompt
    pub chat_file_chars: usize,
    /// Characters of each file kept in a voice prompt
    pub voice_file_chars: usize,
    /// Characters of each file kept in the deep summary prompt
    pub summary_file_chars: usize,
    /// How many critical files stage one asks for
    pub critical_files: usize,
}

/// Rate limit settings for outbound APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimits {
    /// Language model requests per minute
    pub llm_per_minute: usize,
}

impl Config {
    /// Loads configuration from the default config file location, then
    /// overlays environment variables
    ///
    /// A missing config file yields the defaults.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IntrospectError::Config("Could not find config directory".into()))?;
        let config_path = config_dir.join("repo-introspector").join("config.toml");

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Reads a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IntrospectError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| IntrospectError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Overlays values taken from environment variables
    pub fn apply_env(&mut self) {
        if let Some(token) = get_env_value("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        self.api_keys.merge_missing(ApiKeys::from_env());
        if let Some(base) = get_env_value("GITHUB_API_BASE_URL") {
            self.endpoints.github_api = base;
        }
        if let Some(path) = get_env_value("INTROSPECTOR_DB") {
            self.server.database_path = PathBuf::from(path);
        }
        if let Some(addr) = get_env_value("INTROSPECTOR_BIND") {
            self.server.bind_addr = addr;
        }
    }

    /// Validates that configured tokens are usable
    pub fn validate(&self) -> Result<()> {
        let tokens = [
            ("GitHub token", self.github_token.as_deref()),
            ("Gemini API key", self.api_keys.gemini_api_key.as_deref()),
            ("ElevenLabs API key", self.api_keys.elevenlabs_api_key.as_deref()),
        ];
        for (name, value) in tokens {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(IntrospectError::Config(format!("{} is empty", name)));
                }
            }
        }
        if self.limits.max_chat_files == 0 {
            return Err(IntrospectError::Config("max_chat_files must be at least 1".into()));
        }
        Ok(())
    }

    /// Retrieves the GitHub token from the configuration
    pub fn github_token(&self) -> Result<&str> {
        self.github_token
            .as_deref()
            .ok_or_else(|| IntrospectError::Config("GitHub token not configured".into()))
    }
}

impl Timeouts {
    /// GitHub request timeout
    pub fn github(&self) -> Duration {
        Duration::from_secs(self.github_secs)
    }

    /// Language model request timeout
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_secs)
    }

    /// Text-to-speech request timeout
    pub fn speech(&self) -> Duration {
        Duration::from_secs(self.speech_secs)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            gemini_api: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            elevenlabs_api: "https://api.elevenlabs.io/v1".to_string(),
            elevenlabs_voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_path: PathBuf::from("dev.db"),
            log_level: "info".to_string(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            github_secs: 30,
            llm_secs: 60,
            speech_secs: 60,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_chat_files: 3,
            chat_file_chars: 15_000,
            voice_file_chars: 8_000,
            summary_file_chars: 10_000,
            critical_files: 7,
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self { llm_per_minute: 5 }
    }
}
