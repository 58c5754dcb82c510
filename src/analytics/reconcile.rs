//! Commit author attribution.
//!
//! A commit is credited to the linked platform account when GitHub resolved
//! one, otherwise to the raw git author name. Two people sharing a display
//! name therefore share a bucket.

use super::report::{ContributorIdentity, ContributorStat};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// One element of `GET /repos/{owner}/{repo}/commits`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCommit {
    /// Linked platform account, `null` when the email matches no account
    #[serde(default)]
    pub author: Option<LinkedAuthor>,
    /// Git-level commit data
    #[serde(default)]
    pub commit: Option<CommitPayload>,
}

/// Platform account linked to a commit
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LinkedAuthor {
    /// Account login
    #[serde(default)]
    pub login: Option<String>,
    /// Account avatar
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Git object data embedded in a commit record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommitPayload {
    /// Git author signature
    #[serde(default)]
    pub author: Option<GitSignature>,
}

/// Name, email and date from a git signature
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GitSignature {
    /// Free-text author name
    #[serde(default)]
    pub name: Option<String>,
    /// Author email
    #[serde(default)]
    pub email: Option<String>,
    /// ISO 8601 author date
    #[serde(default)]
    pub date: Option<String>,
}

impl RawCommit {
    /// A commit linked to the account `login`
    pub fn linked(login: &str, avatar_url: &str) -> Self {
        Self {
            author: Some(LinkedAuthor {
                login: Some(login.to_string()),
                avatar_url: Some(avatar_url.to_string()),
            }),
            commit: None,
        }
    }

    /// A commit carrying only git metadata
    pub fn unlinked(name: &str, date: Option<&str>) -> Self {
        Self {
            author: None,
            commit: Some(CommitPayload {
                author: Some(GitSignature {
                    name: Some(name.to_string()),
                    email: None,
                    date: date.map(str::to_string),
                }),
            }),
        }
    }

    fn signature(&self) -> Option<&GitSignature> {
        self.commit.as_ref()?.author.as_ref()
    }

    /// Attribution key and avatar, if any identity can be resolved
    pub fn identity(&self) -> Option<(&str, Option<&str>)> {
        if let Some(author) = &self.author {
            if let Some(login) = non_empty(author.login.as_deref()) {
                return Some((login, non_empty(author.avatar_url.as_deref())));
            }
        }
        non_empty(self.signature()?.name.as_deref()).map(|name| (name, None))
    }

    /// Parsed author date
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let date = self.signature()?.date.as_deref()?;
        DateTime::parse_from_rfc3339(date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

/// Blank values count as absent; anything else is kept as written
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Per-author totals and the commit timeline for one fetch window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Commits per identity
    pub totals: HashMap<String, u64>,
    /// Avatar per identity; empty for unlinked authors
    pub avatars: HashMap<String, String>,
    /// One entry per commit whose date parsed
    pub timeline: Vec<DateTime<Utc>>,
}

impl Reconciliation {
    /// Number of commits that were attributed to someone
    pub fn attributed(&self) -> u64 {
        self.totals.values().sum()
    }

    /// Contributor stats, most commits first, ties by login
    pub fn into_contributors(self) -> Vec<ContributorStat> {
        let Reconciliation {
            totals, mut avatars, ..
        } = self;

        let mut contributors: Vec<ContributorStat> = totals
            .into_iter()
            .map(|(login, total)| ContributorStat {
                author: ContributorIdentity {
                    avatar_url: avatars.remove(&login).unwrap_or_default(),
                    login,
                },
                total,
            })
            .collect();

        contributors.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.author.login.cmp(&b.author.login)));
        contributors
    }
}

/// Attributes each commit to an author and collects commit timestamps
///
/// Author resolution and timestamp parsing are independent: a commit with
/// no resolvable author still lands on the timeline, and an unparseable
/// date does not affect the author count.
pub fn reconcile(commits: &[RawCommit]) -> Reconciliation {
    let mut result = Reconciliation::default();

    for commit in commits {
        if let Some((key, avatar)) = commit.identity() {
            *result.totals.entry(key.to_string()).or_insert(0) += 1;
            match avatar {
                Some(url) => {
                    result.avatars.insert(key.to_string(), url.to_string());
                }
                None => {
                    result.avatars.entry(key.to_string()).or_default();
                }
            }
        }

        if let Some(timestamp) = commit.timestamp() {
            result.timeline.push(timestamp);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_linked_and_fallback_scenario() -> serde_json::Result<()> {
        let commits: Vec<RawCommit> = serde_json::from_str(
            r#"[
                {"author": {"login": "ada"}},
                {"author": {"login": "ada"}},
                {"commit": {"author": {"name": "bob"}}}
            ]"#,
        )?;

        let result = reconcile(&commits);
        let expected: HashMap<String, u64> = [("ada".to_string(), 2), ("bob".to_string(), 1)].into_iter().collect();
        assert_eq!(result.totals, expected);
        assert_eq!(result.avatars.get("bob").map(String::as_str), Some(""));
        Ok(())
    }

    #[test]
    fn test_null_author_falls_back_to_git_name() -> serde_json::Result<()> {
        let commits: Vec<RawCommit> = serde_json::from_str(
            r#"[{
                "sha": "abc",
                "author": null,
                "committer": null,
                "commit": {"author": {"name": "Grace", "email": "g@example.com", "date": "2024-03-01T10:00:00Z"}}
            }]"#,
        )?;

        let result = reconcile(&commits);
        assert_eq!(result.totals.get("Grace"), Some(&1));
        assert_eq!(result.timeline.len(), 1);
        Ok(())
    }

    #[test]
    fn test_unresolvable_commit_only_hits_timeline() {
        let commit = RawCommit {
            author: Some(LinkedAuthor::default()),
            commit: Some(CommitPayload {
                author: Some(GitSignature {
                    name: Some("  ".into()),
                    email: None,
                    date: Some("2024-03-01T10:00:00+02:00".into()),
                }),
            }),
        };

        let result = reconcile(&[commit]);
        assert!(result.totals.is_empty());
        assert_eq!(result.timeline.len(), 1);
        assert_eq!(result.timeline[0].to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn test_bad_date_keeps_author_count() {
        let result = reconcile(&[RawCommit::unlinked("bob", Some("yesterday"))]);
        assert_eq!(result.totals.get("bob"), Some(&1));
        assert!(result.timeline.is_empty());
    }

    #[test]
    fn test_padded_identities_stay_distinct() {
        let result = reconcile(&[
            RawCommit::linked(" ada ", "x"),
            RawCommit::linked("ada", "y"),
            RawCommit::unlinked("bob ", None),
        ]);

        let expected: HashMap<String, u64> = [(" ada ".to_string(), 1), ("ada".to_string(), 1), ("bob ".to_string(), 1)]
            .into_iter()
            .collect();
        assert_eq!(result.totals, expected);
        assert_eq!(result.avatars.get(" ada ").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_last_avatar_wins() {
        let result = reconcile(&[RawCommit::linked("ada", "https://a/1"), RawCommit::linked("ada", "https://a/2")]);
        assert_eq!(result.avatars.get("ada").map(String::as_str), Some("https://a/2"));
    }

    #[test]
    fn test_into_contributors_order() {
        let result = reconcile(&[
            RawCommit::linked("zed", "z.png"),
            RawCommit::unlinked("amy", None),
            RawCommit::linked("zed", "z.png"),
            RawCommit::unlinked("bob", None),
        ]);

        let contributors = result.into_contributors();
        let logins: Vec<&str> = contributors.iter().map(|c| c.author.login.as_str()).collect();
        assert_eq!(logins, vec!["zed", "amy", "bob"]);
        assert_eq!(contributors[0].author.avatar_url, "z.png");
        assert_eq!(contributors[0].total, 2);
    }

    fn arb_commit() -> impl Strategy<Value = RawCommit> {
        let name = prop::option::of(prop::sample::select(vec!["", "ada", "bob", "Ada", "carol"]));
        (name.clone(), name).prop_map(|(login, git_name)| RawCommit {
            author: login.map(|l| LinkedAuthor {
                login: Some(l.to_string()),
                avatar_url: None,
            }),
            commit: git_name.map(|n| CommitPayload {
                author: Some(GitSignature {
                    name: Some(n.to_string()),
                    email: None,
                    date: None,
                }),
            }),
        })
    }

    proptest! {
        #[test]
        fn prop_totals_match_resolvable_commits(commits in prop::collection::vec(arb_commit(), 0..60)) {
            let resolvable = commits.iter().filter(|c| c.identity().is_some()).count() as u64;
            prop_assert_eq!(reconcile(&commits).attributed(), resolvable);
        }
    }
}
