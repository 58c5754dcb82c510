use super::{GitHubClient, RepoRef};
use crate::error::{IntrospectError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::task::JoinSet;
use tracing::{info, warn};
use url::Url;

/// Response of `GET /repos/{owner}/{repo}/contents/{path}` for a file
#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    /// File name
    #[serde(default)]
    pub name: String,
    /// Path from the repository root
    #[serde(default)]
    pub path: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Encoded body
    #[serde(default)]
    pub content: String,
    /// Encoding of `content`, normally `base64`
    #[serde(default)]
    pub encoding: String,
}

impl FileContent {
    /// Decodes the body to text
    ///
    /// GitHub wraps base64 bodies at 60 columns, so whitespace is dropped
    /// before decoding. Invalid UTF-8 is replaced rather than rejected.
    pub fn decoded(&self) -> Result<String> {
        if self.encoding != "base64" {
            return Ok(self.content.clone());
        }

        let compact: String = self.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| IntrospectError::decode(format!("invalid base64 in {}: {}", self.path, e), ""))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl GitHubClient {
    /// Contents endpoint for `path`, each segment percent-encoded
    pub fn contents_url(&self, repo: &RepoRef, path: &str) -> Result<String> {
        let base = self.repo_url(repo, "/contents");
        let mut url = Url::parse(&base)
            .map_err(|e| IntrospectError::Config(format!("invalid GitHub API base {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| IntrospectError::Config(format!("GitHub API base cannot take a path: {}", base)))?
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url.into())
    }

    /// Text content of one file
    pub async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<String> {
        let url = self.contents_url(repo, path)?;
        let content: FileContent = self.get_json(&url).await?;
        content.decoded()
    }

    /// Fetches several files concurrently, one task per path
    ///
    /// Individual failures are logged and skipped; the call only fails when
    /// no file could be fetched.
    pub async fn fetch_files(&self, repo: &RepoRef, paths: &[String]) -> Result<BTreeMap<String, String>> {
        let mut tasks = JoinSet::new();
        for path in paths {
            let client = self.clone();
            let repo = repo.clone();
            let path = path.clone();
            tasks.spawn(async move {
                let content = client.file_content(&repo, &path).await;
                (path, content)
            });
        }

        let mut files = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, Ok(content))) => {
                    files.insert(path, content);
                }
                Ok((path, Err(e))) => warn!(repo = %repo, path = %path, error = %e, "skipping file"),
                Err(e) => warn!(repo = %repo, error = %e, "file fetch task failed"),
            }
        }

        if files.is_empty() {
            return Err(IntrospectError::NotFound("no files could be fetched".into()));
        }

        info!(repo = %repo, requested = paths.len(), fetched = files.len(), "fetched file contents");
        Ok(files)
    }
}
