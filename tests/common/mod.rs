#![allow(dead_code)]

use mockito::{Matcher, Mock, ServerGuard};
use repo_introspector::cache::{MemoryReportStore, ReportStore};
use repo_introspector::config::Config;
use repo_introspector::IntrospectService;
use serde_json::json;
use std::sync::Arc;

pub mod test_helpers {
    use super::*;

    pub const GEMINI_KEY: &str = "test-gemini-key";
    pub const MODEL: &str = "test-model";

    pub async fn setup_test_server() -> ServerGuard {
        mockito::Server::new_async().await
    }

    /// Config pointing every upstream at the mock server
    pub fn create_test_config(server: &ServerGuard) -> Config {
        let mut config = Config::default();
        config.github_token = Some("test-token".into());
        config.api_keys.gemini_api_key = Some(GEMINI_KEY.into());
        config.api_keys.elevenlabs_api_key = Some("test-speech-key".into());
        config.endpoints.github_api = server.url();
        config.endpoints.gemini_api = format!("{}/models", server.url());
        config.endpoints.gemini_model = MODEL.into();
        config.endpoints.elevenlabs_api = format!("{}/speech", server.url());
        config.endpoints.elevenlabs_voice_id = "voice-1".into();
        config.timeouts.github_secs = 5;
        config.timeouts.llm_secs = 5;
        config.timeouts.speech_secs = 5;
        config.rate_limits.llm_per_minute = 0;
        config
    }

    pub fn create_test_service(config: Config) -> (Arc<IntrospectService>, MemoryReportStore) {
        let store = MemoryReportStore::new();
        let shared: Arc<dyn ReportStore> = Arc::new(store.clone());
        let service = IntrospectService::new(config, shared).expect("service should build");
        (Arc::new(service), store)
    }

    pub fn repo_json(name: &str) -> String {
        json!({
            "id": 42,
            "name": name,
            "full_name": format!("Upstream/{}", name),
            "description": "A widget factory",
            "html_url": format!("https://github.com/acme/{}", name),
            "language": "Rust",
            "stargazers_count": 120,
            "forks_count": 8,
            "open_issues_count": 3,
            "created_at": "2021-06-01T12:00:00Z"
        })
        .to_string()
    }

    pub fn commits_json(entries: &[(Option<&str>, &str, &str)]) -> String {
        let commits: Vec<_> = entries
            .iter()
            .map(|(login, name, date)| {
                json!({
                    "sha": "0000",
                    "author": login.map(|l| json!({"login": l, "avatar_url": format!("https://avatars/{}", l)})),
                    "commit": {"author": {"name": name, "email": "dev@example.com", "date": date}}
                })
            })
            .collect();
        serde_json::Value::Array(commits).to_string()
    }

    pub fn content_json(path: &str, text: &str) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(text);
        json!({
            "name": path.rsplit('/').next().unwrap_or(path),
            "path": path,
            "size": text.len(),
            "encoding": "base64",
            "content": encoded
        })
        .to_string()
    }

    pub fn gemini_reply(text: &str) -> String {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]}).to_string()
    }

    pub async fn mock_json(server: &mut ServerGuard, path: &str, body: String) -> Mock {
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Metadata, languages and a single page of commits for `acme/widget`
    pub async fn mock_widget_repo(server: &mut ServerGuard) -> Vec<Mock> {
        vec![
            mock_json(server, "/repos/acme/widget", repo_json("widget")).await,
            mock_json(server, "/repos/acme/widget/languages", json!({"Rust": 9000, "Shell": 120}).to_string()).await,
            mock_json(
                server,
                "/repos/acme/widget/commits",
                commits_json(&[
                    (Some("ada"), "Ada L", "2024-01-02T10:00:00Z"),
                    (Some("ada"), "Ada L", "2024-01-03T10:00:00Z"),
                    (None, "bob", "2024-01-04T10:00:00Z"),
                ]),
            )
            .await,
        ]
    }

    pub fn gemini_path() -> String {
        format!("/models/{}:generateContent", MODEL)
    }
}
