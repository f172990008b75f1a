use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Message;
use crate::settings::SettingsStore;

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a summarization request produced no summary. All variants surface
/// verbatim as the displayed error text; none is retried automatically.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("API key is required. Set GEMINI_API_KEY at build time or enter one in settings.")]
    MissingCredential,
    #[error("network error: {0}")]
    TransportFailure(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// The external summarization service, as the scheduler sees it.
/// Cancellation is cooperative: the scheduler abandons the future and the
/// request is torn down with it.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[Message]) -> Result<String, SummarizeError>;
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_prompt(messages: &[Message]) -> String {
    let lines = messages
        .iter()
        .map(Message::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Please summarize the following WhatsApp messages concisely in 2-3 sentences:\n\n{lines}\n\nSummary:"
    )
}

fn extract_summary(response: GenerateResponse) -> Result<String, SummarizeError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            SummarizeError::MalformedResponse("no summary text in response".to_string())
        })
}

/// Resolution order for the credential: runtime setting, then the
/// build-time default, then nothing.
fn resolve_api_key(runtime: Option<String>, build_default: Option<&str>) -> Option<String> {
    runtime
        .filter(|key| !key.is_empty())
        .or_else(|| build_default.filter(|key| !key.is_empty()).map(str::to_string))
}

pub struct GeminiClient {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
    build_time_key: Option<&'static str>,
}

impl GeminiClient {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self::with_build_time_key(settings, option_env!("GEMINI_API_KEY"))
    }

    pub fn with_build_time_key(
        settings: Arc<SettingsStore>,
        build_time_key: Option<&'static str>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            settings,
            build_time_key,
        }
    }

    fn api_key(&self) -> Option<String> {
        resolve_api_key(self.settings.api_key(), self.build_time_key)
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, messages: &[Message]) -> Result<String, SummarizeError> {
        // Credential check comes before any network attempt.
        let api_key = self.api_key().ok_or(SummarizeError::MissingCredential)?;

        if messages.is_empty() {
            return Ok("No messages to summarize".to_string());
        }

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(messages),
                }],
            }],
        };

        log::debug!("Requesting summary for {} messages", messages.len());

        let response = self
            .http
            .post(format!("{GEMINI_API_URL}?key={api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SummarizeError::TransportFailure("request timed out".to_string())
                } else if err.is_connect() {
                    SummarizeError::TransportFailure("unable to reach the API".to_string())
                } else {
                    SummarizeError::TransportFailure(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SummarizeError::TransportFailure(format!(
                "API returned {status}: {detail}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| SummarizeError::MalformedResponse(err.to_string()))?;

        extract_summary(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_messages_as_sender_text_lines() {
        let messages = vec![Message::new("Alice", "lunch?"), Message::new("Bob", "sure")];
        let prompt = build_prompt(&messages);

        assert!(prompt.starts_with("Please summarize the following WhatsApp messages"));
        assert!(prompt.contains("Alice: lunch?\nBob: sure"));
        assert!(prompt.trim_end().ends_with("Summary:"));
    }

    #[test]
    fn summary_is_extracted_and_trimmed() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  They agreed on lunch. \n"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_summary(response).unwrap(), "They agreed on lunch.");
    }

    #[test]
    fn empty_candidates_are_malformed() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_summary(response),
            Err(SummarizeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn runtime_key_beats_build_time_default() {
        assert_eq!(
            resolve_api_key(Some("R".into()), Some("B")).as_deref(),
            Some("R")
        );
        assert_eq!(resolve_api_key(None, Some("B")).as_deref(), Some("B"));
        assert_eq!(resolve_api_key(Some(String::new()), Some("B")).as_deref(), Some("B"));
        assert!(resolve_api_key(None, None).is_none());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let client = GeminiClient::with_build_time_key(settings, None);

        let result = client.summarize(&[Message::new("Alice", "hi")]).await;
        assert!(matches!(result, Err(SummarizeError::MissingCredential)));
    }

    #[tokio::test]
    async fn empty_message_list_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        let client = GeminiClient::with_build_time_key(settings, Some("key"));

        assert_eq!(
            client.summarize(&[]).await.unwrap(),
            "No messages to summarize"
        );
    }
}
