use crate::ai::{self, ChatMode, ChatRequest, ChatResponse, GeminiClient, SmartSummary, SpeechClient, VoiceChatResponse};
use crate::analytics::{Aggregator, AnalyticsReport, DateRange};
use crate::cache::ReportStore;
use crate::config::Config;
use crate::error::{IntrospectError, Result, StageError};
use crate::github::tree::FileNode;
use crate::github::{parse_repo_url, GitHubClient, RepoRef};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Request payload for `POST /api/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// `https://github.com/{owner}/{repo}`
    pub repo_url: String,
    /// First day of commit history, `YYYY-MM-DD`
    #[serde(default)]
    pub since: Option<String>,
    /// Last day of commit history, `YYYY-MM-DD`
    #[serde(default)]
    pub until: Option<String>,
}

/// Request payload naming a repository by its parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRequest {
    /// Repository owner
    #[serde(default)]
    pub owner: String,
    /// Repository name
    #[serde(default)]
    pub repo: String,
}

impl RepoRequest {
    /// Validated repository reference
    pub fn repo_ref(&self) -> Result<RepoRef> {
        let (owner, repo) = (self.owner.trim(), self.repo.trim());
        if owner.is_empty() || repo.is_empty() {
            return Err(IntrospectError::Validation("Invalid request. Required: owner and repo".into()));
        }
        Ok(RepoRef::new(owner, repo))
    }
}

/// Response of `POST /api/file-tree`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTreeResponse {
    /// Root-level nodes
    pub tree: Vec<FileNode>,
}

/// Service health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Service name
    pub service: String,
    /// `healthy` or `degraded`
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since startup
    pub uptime: u64,
    /// Whether the report store answered a lookup
    pub store_ok: bool,
}

/// Everything the HTTP handlers need, wired once at startup
pub struct IntrospectService {
    config: Config,
    github: GitHubClient,
    aggregator: Aggregator<GitHubClient>,
    store: Arc<dyn ReportStore>,
    gemini: GeminiClient,
    speech: SpeechClient,
    started: Instant,
}

impl IntrospectService {
    /// Builds all clients from `config`
    pub fn new(config: Config, store: Arc<dyn ReportStore>) -> Result<Self> {
        let github = GitHubClient::new(&config)?;
        let gemini = GeminiClient::new(&config)?;
        let speech = SpeechClient::new(&config)?;
        Ok(Self::from_parts(config, github, gemini, speech, store))
    }

    /// Assembles a service from prebuilt clients
    pub fn from_parts(
        config: Config,
        github: GitHubClient,
        gemini: GeminiClient,
        speech: SpeechClient,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(github.clone()),
            config,
            github,
            store,
            gemini,
            speech,
            started: Instant::now(),
        }
    }

    /// Analytics report for a repository URL
    ///
    /// Unscoped requests are served from the store when possible and stored
    /// after a fresh aggregation. Date-scoped requests neither read nor write
    /// the store.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyticsReport> {
        let repo = parse_repo_url(&request.repo_url)?;
        let range = DateRange::parse(request.since.as_deref(), request.until.as_deref())?;
        let full_name = repo.full_name();

        if !range.is_scoped() {
            match self.store.get(&full_name).await {
                Ok(Some(report)) => {
                    info!(repo = %full_name, "returning cached report");
                    return Ok(report);
                }
                Ok(None) => {}
                Err(e) => warn!(repo = %full_name, error = %e, "report store lookup failed"),
            }
        }

        info!(repo = %full_name, scoped = range.is_scoped(), "fetching fresh analytics");
        let report = self.aggregator.aggregate(&repo, &range).await?;

        if !range.is_scoped() {
            if let Err(e) = self.store.save(&report).await {
                warn!(repo = %full_name, error = %e, "failed to store report");
            }
        }
        Ok(report)
    }

    /// Previously stored report for `owner/repo`
    pub async fn get_report(&self, owner: &str, repo: &str) -> Result<AnalyticsReport> {
        let full_name = RepoRef::new(owner, repo).full_name();
        self.store
            .get(&full_name)
            .await?
            .ok_or_else(|| IntrospectError::NotFound("report not found".into()))
    }

    /// Two-stage model summary of a repository
    pub async fn smart_summary(&self, request: &RepoRequest) -> std::result::Result<SmartSummary, StageError> {
        let repo = request
            .repo_ref()
            .map_err(StageError::at(crate::error::SummaryStage::ScanningStructure))?;
        ai::smart_summary(&self.github, &self.gemini, &repo, &self.config.limits).await
    }

    /// Nested file hierarchy of a repository
    pub async fn file_tree(&self, request: &RepoRequest) -> Result<FileTreeResponse> {
        let repo = request.repo_ref()?;
        let tree = self.github.file_tree(&repo).await?;
        Ok(FileTreeResponse { tree })
    }

    /// Text answer about the selected files
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = ai::chat::chat(&self.github, &self.gemini, request, &self.config.limits, ChatMode::Text).await?;
        Ok(ChatResponse { response })
    }

    /// Spoken answer about the selected files
    ///
    /// A speech failure still yields the text answer, with the failure in
    /// `audio_error`.
    pub async fn voice_chat(&self, request: &ChatRequest) -> Result<VoiceChatResponse> {
        let response =
            ai::chat::chat(&self.github, &self.gemini, request, &self.config.limits, ChatMode::Voice).await?;

        match self.speech.synthesize(&response).await {
            Ok(audio) => Ok(VoiceChatResponse {
                response,
                audio: Some(STANDARD.encode(audio)),
                audio_error: None,
            }),
            Err(e) => {
                warn!(error = %e, "speech synthesis failed, returning text only");
                Ok(VoiceChatResponse {
                    response,
                    audio: None,
                    audio_error: Some(e.to_string()),
                })
            }
        }
    }

    /// Health snapshot, probing the report store
    pub async fn health(&self) -> HealthStatus {
        let store_ok = self.store.get("").await.is_ok();
        HealthStatus {
            service: env!("CARGO_PKG_NAME").to_string(),
            status: if store_ok { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime: self.started.elapsed().as_secs(),
            store_ok,
        }
    }
}
