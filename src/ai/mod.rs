//! Language model and speech collaborators: smart summaries, chat over
//! selected files, and text-to-speech for voice replies.

/// Completion API client
pub mod gemini;
/// Prompt templates
pub mod prompts;
/// Two-stage repository summary
pub mod summary;
/// File-scoped chat
pub mod chat;
/// Text-to-speech client
pub mod speech;

pub use chat::{ChatMessage, ChatMode, ChatRequest, ChatResponse, VoiceChatResponse};
pub use gemini::{GeminiClient, Role, Turn};
pub use speech::SpeechClient;
pub use summary::{smart_summary, Complexity, SmartSummary};

use std::borrow::Cow;

/// Cuts `text` to at most `limit` characters, appending `marker` when cut
pub fn truncate_chars<'a>(text: &'a str, limit: usize, marker: &str) -> Cow<'a, str> {
    match text.char_indices().nth(limit) {
        Some((end, _)) => Cow::Owned(format!("{}{}", &text[..end], marker)),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10, "…"), "short");
        assert_eq!(truncate_chars("exactly", 7, "!"), "exactly");
        assert_eq!(truncate_chars("héllo wörld", 5, "+"), "héllo+");
    }
}
