use crate::config::Config;
use crate::error::{IntrospectError, Result};
use crate::rate_limiter::{RateLimiter, LLM};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const TEMPERATURE: f32 = 0.7;
const SINGLE_TURN_TOKENS: u32 = 4096;
const CHAT_TOKENS: u32 = 1024;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking
    User,
    /// The language model
    Model,
}

/// One text fragment of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Text content
    #[serde(default)]
    pub text: String,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// What was said
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Turn {
    /// A single-part turn
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part { text: text.into() }],
        }
    }

    /// A user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// A model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    /// Text of the first part, if any
    pub fn text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [Turn],
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Turn>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

/// Client for a `generateContent`-style completion API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    limiter: RateLimiter,
}

impl GeminiClient {
    /// Builds a client from the application configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(
            &config.endpoints.gemini_api,
            &config.endpoints.gemini_model,
            config.api_keys.gemini_api_key.clone(),
            config.timeouts.llm(),
            RateLimiter::new(&config.rate_limits),
        )
    }

    /// Builds a client against an arbitrary API root
    pub fn with_base_url(
        api_base: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
        limiter: RateLimiter,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntrospectError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            limiter,
        })
    }

    /// Single-turn completion, optionally asking for a JSON reply
    pub async fn generate(&self, prompt: &str, json_output: bool) -> Result<String> {
        let config = GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: SINGLE_TURN_TOKENS,
            response_mime_type: json_output.then_some("application/json"),
        };
        self.call(&[Turn::user(prompt)], config).await
    }

    /// Multi-turn completion over `turns`
    pub async fn converse(&self, turns: &[Turn]) -> Result<String> {
        let config = GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: CHAT_TOKENS,
            response_mime_type: None,
        };
        self.call(turns, config).await
    }

    async fn call(&self, turns: &[Turn], generation_config: GenerationConfig) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| IntrospectError::Config("GEMINI_API_KEY not set".into()))?;

        self.limiter.acquire(LLM).await;

        let endpoint = format!("{}/{}:generateContent", self.api_base, self.model);
        debug!(model = %self.model, turns = turns.len(), "calling language model");

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&GenerateRequest {
                contents: turns,
                generation_config,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let text = parse_reply(&endpoint, status, body)?;

        info!(model = %self.model, chars = text.len(), "language model replied");
        Ok(text)
    }
}

/// Interprets a `generateContent` response
///
/// An error envelope is reported as [`IntrospectError::Llm`] whatever the
/// status. A body that is not an envelope is an API error for a failed
/// status and a decode error otherwise.
fn parse_reply(endpoint: &str, status: StatusCode, body: String) -> Result<String> {
    let parsed: GenerateResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(_) if status == StatusCode::TOO_MANY_REQUESTS => {
            return Err(IntrospectError::RateLimitExceeded(format!("{} returned status 429", endpoint)));
        }
        Err(_) if !status.is_success() => {
            return Err(IntrospectError::Api {
                service: "gemini",
                url: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Err(e) => {
            return Err(IntrospectError::decode(format!("unexpected language model payload: {}", e), body));
        }
    };

    if let Some(error) = parsed.error {
        return Err(IntrospectError::Llm(format!("{} (code: {})", error.message, error.code)));
    }

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| IntrospectError::Llm("no response".into()))
}

/// Removes a surrounding markdown code fence from a model reply
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
