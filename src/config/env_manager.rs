use serde::{Deserialize, Serialize};

/// Stores API keys for the upstream services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// Key for the Gemini generateContent API
    pub gemini_api_key: Option<String>,
    /// Key for the ElevenLabs text-to-speech API
    pub elevenlabs_api_key: Option<String>,
}

impl ApiKeys {
    /// Loads API keys from the environment
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: get_env_value("GEMINI_API_KEY"),
            elevenlabs_api_key: get_env_value("ELEVENLABS_API_KEY"),
        }
    }

    /// Fills in keys that are unset here from `other`
    pub fn merge_missing(&mut self, other: ApiKeys) {
        if self.gemini_api_key.is_none() {
            self.gemini_api_key = other.gemini_api_key;
        }
        if self.elevenlabs_api_key.is_none() {
            self.elevenlabs_api_key = other.elevenlabs_api_key;
        }
    }
}

/// Reads an environment variable, treating an empty value as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
