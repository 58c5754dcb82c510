use crate::error::{IntrospectError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// High-level metadata of a repository, as served by `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// Repository name
    pub name: String,
    /// `owner/name`, always stamped from the caller's request
    pub full_name: String,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Browser URL
    pub html_url: String,
    /// Primary language
    #[serde(default)]
    pub language: Option<String>,
    /// Language name to bytes of code
    #[serde(default)]
    pub languages: BTreeMap<String, u64>,
    /// Star count
    #[serde(default)]
    pub stargazers_count: u64,
    /// Fork count
    #[serde(default)]
    pub forks_count: u64,
    /// Open issues and pull requests
    #[serde(default)]
    pub open_issues_count: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Identity a contributor's commits are attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorIdentity {
    /// Platform login, or the git author name when no account is linked
    pub login: String,
    /// Avatar URL, empty for unlinked authors
    #[serde(default)]
    pub avatar_url: String,
}

/// Commits attributed to one identity within the fetch window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorStat {
    /// Who
    pub author: ContributorIdentity,
    /// How many commits
    pub total: u64,
}

/// The aggregate analytics snapshot for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Repository metadata, including the language breakdown
    pub repo_info: RepositoryMetadata,
    /// Per-author commit totals
    pub contributors: Vec<ContributorStat>,
    /// Copy of `repo_info.languages`
    pub file_types: BTreeMap<String, u64>,
    /// One timestamp per commit with a parseable date, unordered
    pub commit_timeline: Vec<DateTime<Utc>>,
    /// When the snapshot was assembled
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsReport {
    /// Cache key of the report
    pub fn full_name(&self) -> &str {
        &self.repo_info.full_name
    }
}

/// Optional inclusive day bounds for the commit history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// First day included
    pub since: Option<NaiveDate>,
    /// Last day included
    pub until: Option<NaiveDate>,
}

impl DateRange {
    /// Parses optional `YYYY-MM-DD` bounds; blank strings count as absent
    pub fn parse(since: Option<&str>, until: Option<&str>) -> Result<Self> {
        let range = Self {
            since: parse_day(since, "since")?,
            until: parse_day(until, "until")?,
        };

        if let (Some(since), Some(until)) = (range.since, range.until) {
            if since > until {
                return Err(IntrospectError::Validation(format!(
                    "since ({}) is after until ({})",
                    since, until
                )));
            }
        }
        Ok(range)
    }

    /// Whether any bound is set
    pub fn is_scoped(&self) -> bool {
        self.since.is_some() || self.until.is_some()
    }

    /// `since` query value: start of the first day, UTC
    pub fn since_param(&self) -> Option<String> {
        self.since.map(|day| format!("{}T00:00:00Z", day.format("%Y-%m-%d")))
    }

    /// `until` query value: end of the last day, UTC
    pub fn until_param(&self) -> Option<String> {
        self.until.map(|day| format!("{}T23:59:59Z", day.format("%Y-%m-%d")))
    }
}

fn parse_day(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").map(Some).map_err(|_| {
            IntrospectError::Validation(format!("{} must be a YYYY-MM-DD date, got {:?}", field, v))
        }),
    }
}
