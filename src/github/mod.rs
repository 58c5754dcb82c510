//! GitHub REST client used by the aggregator, the tree endpoint and the
//! file-based chat features.

use crate::analytics::aggregator::RepositorySource;
use crate::analytics::reconcile::RawCommit;
use crate::analytics::report::{DateRange, RepositoryMetadata};
use crate::config::Config;
use crate::error::{IntrospectError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Paged endpoint handling
pub mod pagination;
/// Repository tree retrieval and hierarchy building
pub mod tree;
/// File content retrieval
pub mod contents;

use pagination::{collect_pages, parse_next_link, Page, PageFetcher};

const GITHUB_HOST: &str = "github.com";
const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const COMMITS_PER_PAGE: u32 = 100;

/// An `owner/name` pair identifying a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    /// Account or organization that owns the repository
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Creates a reference from its two parts
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// The `owner/name` key used for caching
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Extracts owner and repository name from a `https://github.com/owner/repo` URL
///
/// Extra path segments (`/tree/main/...`) and a trailing `.git` are ignored.
pub fn parse_repo_url(repo_url: &str) -> Result<RepoRef> {
    let trimmed = repo_url.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|_| IntrospectError::Validation("Invalid URL format".into()))?;

    let host = parsed.host_str().unwrap_or_default();
    if host != GITHUB_HOST && host != "www.github.com" {
        return Err(IntrospectError::Validation("Not a GitHub URL".into()));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [owner, name, ..] => {
            let name = name.strip_suffix(".git").unwrap_or(name);
            if name.is_empty() {
                return Err(IntrospectError::Validation("Invalid GitHub URL format".into()));
            }
            Ok(RepoRef::new(*owner, name))
        }
        _ => Err(IntrospectError::Validation("Invalid GitHub URL format".into())),
    }
}

/// Authenticated client for the GitHub REST API
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
    api_base: String,
}

impl GitHubClient {
    /// Builds a client from the application configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(
            &config.endpoints.github_api,
            config.github_token.clone(),
            config.timeouts.github(),
        )
    }

    /// Builds a client against an arbitrary API root
    pub fn with_base_url(api_base: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repo-introspector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IntrospectError::Network(e.to_string()))?;

        Ok(Self {
            client,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// URL of `/repos/{owner}/{name}{suffix}`
    pub fn repo_url(&self, repo: &RepoRef, suffix: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, repo.owner, repo.name, suffix)
    }

    async fn send(&self, url: &str) -> Result<Response> {
        let mut request = self.client.get(url).header(ACCEPT, ACCEPT_V3);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
            return Err(IntrospectError::RateLimitExceeded(format!("{} returned status {}", url, status.as_u16())));
        }

        Err(IntrospectError::Api {
            service: "github",
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| IntrospectError::decode(format!("unexpected payload from {}: {}", url, e), body))
    }

    /// GETs `url` and decodes the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(url).await?;
        Self::decode(url, response).await
    }

    /// Repository metadata
    pub async fn repository(&self, repo: &RepoRef) -> Result<RepositoryMetadata> {
        self.get_json(&self.repo_url(repo, "")).await
    }

    /// Language name to byte count
    pub async fn languages(&self, repo: &RepoRef) -> Result<BTreeMap<String, u64>> {
        self.get_json(&self.repo_url(repo, "/languages")).await
    }

    /// Every commit in `range`, following pagination
    pub async fn commits(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<RawCommit>> {
        let mut url = self.repo_url(repo, &format!("/commits?per_page={}", COMMITS_PER_PAGE));
        if let Some(since) = range.since_param() {
            url.push_str(&format!("&since={}", since));
        }
        if let Some(until) = range.until_param() {
            url.push_str(&format!("&until={}", until));
        }

        let commits: Vec<RawCommit> = collect_pages(self, url).await?;
        info!(repo = %repo, commits = commits.len(), "fetched commit history");
        Ok(commits)
    }
}

#[async_trait]
impl<T> PageFetcher<T> for GitHubClient
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, url: &str) -> Result<Page<T>> {
        let response = self.send(url).await?;
        let next = next_from_headers(response.headers());
        let records: Vec<T> = Self::decode(url, response).await?;
        debug!(url, records = records.len(), has_next = next.is_some(), "fetched page");
        Ok(Page { records, next })
    }
}

fn next_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_next_link)
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn metadata(&self, repo: &RepoRef) -> Result<RepositoryMetadata> {
        self.repository(repo).await
    }

    async fn languages(&self, repo: &RepoRef) -> Result<BTreeMap<String, u64>> {
        GitHubClient::languages(self, repo).await
    }

    async fn commits(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<RawCommit>> {
        GitHubClient::commits(self, repo, range).await
    }
}
