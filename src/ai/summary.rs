//! Two-stage repository summary: pick the critical files from the tree
//! listing, then summarize their contents.

use super::gemini::{strip_code_fences, GeminiClient};
use super::prompts;
use super::truncate_chars;
use crate::config::Limits;
use crate::error::{IntrospectError, Result, StageError, SummaryStage};
use crate::github::{GitHubClient, RepoRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::info;

/// Rough size of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    /// Small, few moving parts
    Low,
    /// The fallback for anything unrecognized
    #[default]
    Medium,
    /// Large or intricate
    High,
}

impl Complexity {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("Low") => Self::Low,
            Some("High") => Self::High,
            _ => Self::Medium,
        }
    }
}

/// Model-generated overview of a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartSummary {
    /// Project type, e.g. "REST API in Go"
    pub archetype: String,
    /// One-sentence pitch
    pub one_liner: String,
    /// Detected technologies
    pub key_tech: Vec<String>,
    /// Quality score in `1..=10`
    pub code_quality_score: u8,
    /// Low, Medium or High
    pub complexity: Complexity,
    /// Resume entry in LaTeX
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    #[serde(default)]
    archetype: String,
    #[serde(default)]
    one_liner: String,
    #[serde(default)]
    key_tech: Vec<String>,
    #[serde(default)]
    code_quality_score: f64,
    #[serde(default)]
    complexity: Option<String>,
    #[serde(default)]
    latex_code: Option<String>,
}

impl From<RawSummary> for SmartSummary {
    fn from(raw: RawSummary) -> Self {
        let score = if raw.code_quality_score.is_finite() {
            raw.code_quality_score.round().clamp(1.0, 10.0) as u8
        } else {
            1
        };

        Self {
            archetype: raw.archetype,
            one_liner: raw.one_liner,
            key_tech: raw.key_tech,
            code_quality_score: score,
            complexity: Complexity::parse(raw.complexity.as_deref()),
            latex_code: raw.latex_code.filter(|l| !l.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CriticalFiles {
    files: Vec<String>,
}

/// Decodes the stage-one reply into file paths
pub fn parse_critical_files(reply: &str) -> Result<Vec<String>> {
    let cleaned = strip_code_fences(reply);
    let parsed: CriticalFiles = serde_json::from_str(cleaned)
        .map_err(|e| IntrospectError::decode(format!("failed to parse critical files response: {}", e), cleaned))?;

    Ok(parsed
        .files
        .into_iter()
        .map(|f| f.trim().trim_start_matches('/').to_string())
        .filter(|f| !f.is_empty())
        .collect())
}

/// Decodes the stage-two reply, clamping the score and defaulting the complexity
pub fn parse_summary(reply: &str) -> Result<SmartSummary> {
    let cleaned = strip_code_fences(reply);
    let raw: RawSummary = serde_json::from_str(cleaned)
        .map_err(|e| IntrospectError::decode(format!("failed to parse summary response: {}", e), cleaned))?;
    Ok(raw.into())
}

/// Renders files as prompt context, each cut to `limit` characters
pub fn render_files(files: &BTreeMap<String, String>, limit: usize) -> String {
    let mut rendered = String::new();
    for (path, content) in files {
        let _ = write!(rendered, "\n--- FILE: {} ---\n{}\n", path, truncate_chars(content, limit, "\n... [truncated]"));
    }
    rendered
}

impl GeminiClient {
    /// Stage one: asks for the `count` most telling files of a listing
    pub async fn identify_critical_files(&self, listing: &str, count: usize) -> Result<Vec<String>> {
        let prompt = prompts::fill(prompts::CRITICAL_FILES, &[&count.to_string(), listing]);
        let reply = self.generate(&prompt, true).await?;
        parse_critical_files(&reply)
    }

    /// Stage two: summarizes the given file contents
    pub async fn deep_summary(&self, files: &BTreeMap<String, String>, file_chars: usize) -> Result<SmartSummary> {
        let prompt = prompts::fill(prompts::DEEP_SUMMARY, &[&render_files(files, file_chars)]);
        let reply = self.generate(&prompt, true).await?;
        parse_summary(&reply)
    }
}

/// Runs both stages for `repo`, reporting which one failed
pub async fn smart_summary(
    github: &GitHubClient,
    gemini: &GeminiClient,
    repo: &RepoRef,
    limits: &Limits,
) -> std::result::Result<SmartSummary, StageError> {
    let critical = async {
        let tree = github.repo_tree(repo).await?;
        info!(repo = %repo, entries = tree.tree.len(), "identifying critical files");
        gemini.identify_critical_files(&tree.file_listing(), limits.critical_files).await
    }
    .await
    .map_err(StageError::at(SummaryStage::ScanningStructure))?;

    info!(repo = %repo, files = ?critical, "reading critical files");

    let summary = async {
        let files = github.fetch_files(repo, &critical).await?;
        gemini.deep_summary(&files, limits.summary_file_chars).await
    }
    .await
    .map_err(StageError::at(SummaryStage::ReadingFiles))?;

    info!(repo = %repo, archetype = %summary.archetype, "generated smart summary");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_critical_files_fenced() -> Result<()> {
        let reply = "```json\n{\"files\": [\"src/main.rs\", \"/Cargo.toml\", \" \"]}\n```";
        assert_eq!(parse_critical_files(reply)?, vec!["src/main.rs", "Cargo.toml"]);
        Ok(())
    }

    #[test]
    fn test_parse_critical_files_keeps_raw_on_failure() {
        match parse_critical_files("I think main.rs matters most") {
            Err(IntrospectError::Decode { raw, .. }) => assert_eq!(raw, "I think main.rs matters most"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_summary_clamps_and_defaults() -> Result<()> {
        let summary = parse_summary(
            r#"{"archetype":"CLI Tool in Rust","one_liner":"Counts lines.","key_tech":["clap"],"code_quality_score":14,"complexity":"Extreme"}"#,
        )?;
        assert_eq!(summary.code_quality_score, 10);
        assert_eq!(summary.complexity, Complexity::Medium);
        assert_eq!(summary.latex_code, None);

        let low = parse_summary(r#"{"code_quality_score":-3,"complexity":"Low","latex_code":"\\textbf{x}"}"#)?;
        assert_eq!(low.code_quality_score, 1);
        assert_eq!(low.complexity, Complexity::Low);
        assert_eq!(low.latex_code.as_deref(), Some("\\textbf{x}"));
        Ok(())
    }

    #[test]
    fn test_summary_serialized_shape() -> serde_json::Result<()> {
        let summary = SmartSummary {
            archetype: "REST API in Go".into(),
            one_liner: "Serves things.".into(),
            key_tech: vec!["gin".into()],
            code_quality_score: 7,
            complexity: Complexity::High,
            latex_code: None,
        };
        assert_eq!(
            serde_json::to_value(&summary)?,
            serde_json::json!({
                "archetype": "REST API in Go",
                "one_liner": "Serves things.",
                "key_tech": ["gin"],
                "code_quality_score": 7,
                "complexity": "High"
            })
        );
        Ok(())
    }

    #[test]
    fn test_render_files_truncates() {
        let files: BTreeMap<String, String> = [("a.rs".to_string(), "x".repeat(20))].into_iter().collect();
        let rendered = render_files(&files, 5);
        assert!(rendered.contains("--- FILE: a.rs ---\nxxxxx\n... [truncated]"));
    }
}
