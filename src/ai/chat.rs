//! Conversations about a handful of files from a repository.

use super::gemini::{GeminiClient, Turn};
use super::prompts;
use super::truncate_chars;
use crate::config::Limits;
use crate::error::{IntrospectError, Result};
use crate::github::{GitHubClient, RepoRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One earlier message of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
}

/// A question about selected files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Paths of the files under discussion
    #[serde(default)]
    pub files: Vec<String>,
    /// The new question
    pub message: String,
    /// Conversation so far, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    /// The repository this request is about
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(self.owner.trim(), self.repo.trim())
    }

    /// Checks the request shape before anything is fetched
    pub fn validate(&self, max_files: usize) -> Result<()> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() || self.message.trim().is_empty() {
            return Err(IntrospectError::Validation(
                "Invalid request. Required: owner, repo, files, message".into(),
            ));
        }
        if self.files.is_empty() {
            return Err(IntrospectError::Validation("At least one file must be selected".into()));
        }
        if self.files.len() > max_files {
            return Err(IntrospectError::Validation(format!("Maximum {} files allowed", max_files)));
        }
        Ok(())
    }
}

/// Text reply to a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model answer
    pub response: String,
}

/// Reply to a voice chat request
///
/// Exactly one of `audio` and `audio_error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceChatResponse {
    /// Model answer
    pub response: String,
    /// Base64-encoded MP3, `null` when speech synthesis failed
    pub audio: Option<String>,
    /// Why speech synthesis failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_error: Option<String>,
}

/// Register of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Written mentor-style answers
    Text,
    /// Short spoken answers
    Voice,
}

impl ChatMode {
    fn instructions(self) -> &'static str {
        match self {
            Self::Text => prompts::CHAT_INSTRUCTIONS,
            Self::Voice => prompts::VOICE_INSTRUCTIONS,
        }
    }

    fn closing(self) -> &'static str {
        match self {
            Self::Text => prompts::CHAT_CLOSING,
            Self::Voice => "",
        }
    }

    fn acknowledgement(self) -> &'static str {
        match self {
            Self::Text => prompts::CHAT_ACK,
            Self::Voice => prompts::VOICE_ACK,
        }
    }

    fn question_prefix(self) -> &'static str {
        match self {
            Self::Text => "User question: ",
            Self::Voice => "User says: ",
        }
    }

    fn truncation_marker(self) -> &'static str {
        match self {
            Self::Text => "\n... [truncated for length]",
            Self::Voice => "\n... [truncated]",
        }
    }

    /// Per-file character budget
    pub fn file_chars(self, limits: &Limits) -> usize {
        match self {
            Self::Text => limits.chat_file_chars,
            Self::Voice => limits.voice_file_chars,
        }
    }
}

/// Instructions followed by every file, each cut to `file_chars`
pub fn build_context(mode: ChatMode, files: &BTreeMap<String, String>, file_chars: usize) -> String {
    let mut context = String::from(mode.instructions());
    for (path, content) in files {
        context.push_str(&format!("=== FILE: {} ===\n", path));
        context.push_str(&truncate_chars(content, file_chars, mode.truncation_marker()));
        context.push_str("\n\n");
    }
    context.push_str(mode.closing());
    context
}

/// Turns sent to the model for `request`
///
/// Without history the context and question travel in one user turn.
/// Otherwise the context is followed by a canned acknowledgement, the
/// history and finally the new message.
pub fn build_conversation(mode: ChatMode, context: String, request: &ChatRequest) -> Vec<Turn> {
    if request.history.is_empty() {
        return vec![Turn::user(format!(
            "{}\n\n{}{}",
            context,
            mode.question_prefix(),
            request.message
        ))];
    }

    let mut turns = Vec::with_capacity(request.history.len() + 3);
    turns.push(Turn::user(context));
    turns.push(Turn::model(mode.acknowledgement()));
    turns.extend(request.history.iter().map(|message| {
        if message.role == "assistant" {
            Turn::model(message.content.clone())
        } else {
            Turn::user(message.content.clone())
        }
    }));
    turns.push(Turn::user(request.message.clone()));
    turns
}

/// Answers `request` using the content of its files
pub async fn chat(
    github: &GitHubClient,
    gemini: &GeminiClient,
    request: &ChatRequest,
    limits: &Limits,
    mode: ChatMode,
) -> Result<String> {
    request.validate(limits.max_chat_files)?;
    let repo = request.repo_ref();

    let files = github.fetch_files(&repo, &request.files).await?;
    let context = build_context(mode, &files, mode.file_chars(limits));
    let turns = build_conversation(mode, context, request);

    info!(repo = %repo, files = files.len(), turns = turns.len(), mode = ?mode, "sending chat turn");
    gemini.converse(&turns).await
}
