//! Google Gemini client for rule analysis.
//!
//! One `generateContent` call per analysis: no retries, no streaming, and no
//! client-side timeout. Whatever text the first candidate returns is handed
//! back untouched for the caller to extract JSON from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::prompt::build_prompt;
use crate::{AiError, RuleAdvisor};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Checked when a call is made, not at construction.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// `base_url` should be like `https://host/v1beta` (trailing slash is trimmed).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<OutPart<'a>>,
}

#[derive(Serialize)]
struct OutPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<InPart>,
}

#[derive(Deserialize)]
struct InPart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let config = GeminiConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one prompt and return the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AiError::MissingApiKey)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![OutPart { text: prompt }],
            }],
        };

        info!(model = %self.config.model, prompt_chars = prompt.len(), "calling Gemini");
        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let result: GenerateResponse = resp.json().await?;
        let Some(candidate) = result.candidates.into_iter().next() else {
            return Err(AiError::EmptyResponse("no candidates".to_string()));
        };
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(AiError::EmptyResponse(
                candidate
                    .finish_reason
                    .unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        debug!(response_chars = text.len(), "Gemini response received");
        Ok(text)
    }
}

#[async_trait]
impl RuleAdvisor for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn advise(&self, rules_text: &str, requirement: &str) -> Result<String, AiError> {
        self.generate(&build_prompt(rules_text, requirement)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            GeminiConfig::new(api_key.map(str::to_string)).with_base_url(server.base_url()),
        )
    }

    #[test]
    fn config_defaults() {
        let config = GeminiConfig::new(None);
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(
            config.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn client_trims_trailing_slash() {
        let config = GeminiConfig {
            base_url: "http://localhost:4000/".into(),
            ..GeminiConfig::new(None)
        };
        let client = GeminiClient::new(config);
        assert_eq!(client.config.base_url, "http://localhost:4000");
    }

    #[tokio::test]
    async fn returns_joined_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-1.5-flash:generateContent")
                    .query_param("key", "test-key");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{"text": "Here you go: {\"stories\": "}, {"text": "[]}"}]
                        },
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let client = client_for(&server, Some("test-key"));
        let text = client
            .advise("R1 | Check A", "Add Aadhaar check")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Here you go: {\"stories\": []}");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let err = client_for(&server, None).generate("hi").await.unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));

        let err = client_for(&server, Some(""))
            .generate("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::MissingApiKey));
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(403).body("API key not valid");
            })
            .await;

        let err = client_for(&server, Some("bad"))
            .generate("hi")
            .await
            .unwrap_err();
        match err {
            AiError::Server { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "API key not valid");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocked_candidate_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(json!({"candidates": [{"finishReason": "SAFETY"}]}));
            })
            .await;

        let err = client_for(&server, Some("k"))
            .generate("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(ref r) if r == "SAFETY"));
    }

    #[tokio::test]
    async fn no_candidates_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"promptFeedback": {}}));
            })
            .await;

        let err = client_for(&server, Some("k"))
            .generate("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse(_)));
    }
}
