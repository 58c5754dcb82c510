use super::reconcile::{reconcile, RawCommit};
use super::report::{AnalyticsReport, DateRange, RepositoryMetadata};
use crate::error::{IntrospectError, Result};
use crate::github::RepoRef;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Upstream data an analytics report is assembled from
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Repository metadata
    async fn metadata(&self, repo: &RepoRef) -> Result<RepositoryMetadata>;

    /// Language name to byte count
    async fn languages(&self, repo: &RepoRef) -> Result<BTreeMap<String, u64>>;

    /// Commit history within `range`
    async fn commits(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<RawCommit>>;
}

#[async_trait]
impl<S: RepositorySource + ?Sized> RepositorySource for Arc<S> {
    async fn metadata(&self, repo: &RepoRef) -> Result<RepositoryMetadata> {
        (**self).metadata(repo).await
    }

    async fn languages(&self, repo: &RepoRef) -> Result<BTreeMap<String, u64>> {
        (**self).languages(repo).await
    }

    async fn commits(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<RawCommit>> {
        (**self).commits(repo, range).await
    }
}

/// Assembles analytics reports from a [`RepositorySource`]
#[derive(Debug, Clone)]
pub struct Aggregator<S> {
    source: S,
}

impl<S: RepositorySource> Aggregator<S> {
    /// Creates an aggregator reading from `source`
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[cfg(test)]
    fn source(&self) -> &S {
        &self.source
    }

    /// Fetches metadata, languages and commits concurrently and merges them
    ///
    /// A metadata or commit failure fails the whole report, metadata taking
    /// precedence when both fail. A languages failure degrades to an empty
    /// breakdown.
    pub async fn aggregate(&self, repo: &RepoRef, range: &DateRange) -> Result<AnalyticsReport> {
        let (metadata, languages, history) = tokio::join!(
            self.source.metadata(repo),
            self.source.languages(repo),
            async {
                let commits = self.source.commits(repo, range).await?;
                Ok::<_, IntrospectError>((commits.len(), reconcile(&commits)))
            },
        );

        let mut repo_info = metadata?;
        let languages = languages.unwrap_or_else(|e| {
            warn!(repo = %repo, error = %e, transient = e.is_transient(), "language breakdown unavailable");
            BTreeMap::new()
        });
        let (commit_count, reconciliation) = history?;

        let commit_timeline = reconciliation.timeline.clone();
        let contributors = reconciliation.into_contributors();

        repo_info.full_name = repo.full_name();
        repo_info.languages = languages.clone();

        info!(
            repo = %repo,
            commits = commit_count,
            contributors = contributors.len(),
            languages = languages.len(),
            "aggregated repository analytics"
        );

        Ok(AnalyticsReport {
            repo_info,
            contributors,
            file_types: languages,
            commit_timeline,
            generated_at: Utc::now(),
        })
    }
}
