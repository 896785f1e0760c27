//! Google Generative Language API (`generateContent`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{truncate_detail, CompletionService};
use crate::error::ServiceError;
use crate::provider::Provider;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn query(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        // Key goes in a header so it never shows up in logged URLs
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("Gemini", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::from_reqwest("Gemini", e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| truncate_detail(&body));
            return Err(ServiceError::from_status("Gemini", status.as_u16(), &detail));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::malformed(format!("Gemini response could not be parsed: {e}")))?;

        Self::response_text(gemini_response)
    }

    fn response_text(response: GeminiResponse) -> Result<String, ServiceError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(ServiceError::invalid_request(format!("Gemini returned no answer ({reason})")));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "empty reply".to_string());
            return Err(ServiceError::malformed(format!("Gemini returned no text ({reason})")));
        }

        Ok(text)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-1.5-flash".to_string(),
            "gemini-1.5-pro".to_string(),
            "gemini-2.0-flash".to_string(),
            "gemini-2.5-flash".to_string(),
        ]
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        self.query(model, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn sends_single_prompt_and_joins_parts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::with_base_url("test-key", &mock_server.uri());
        let reply = client.complete("gemini-1.5-flash", "Hello").await.unwrap();

        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn bad_key_is_an_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
            })))
            .mount(&mock_server)
            .await;

        let client = GeminiClient::with_base_url("nope", &mock_server.uri());
        let err = client.complete("gemini-1.5-flash", "Hello").await.unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::Auth);
        assert!(err.message.contains("API key not valid"));
    }

    #[tokio::test]
    async fn quota_is_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Resource exhausted"))
            .mount(&mock_server)
            .await;

        let client = GeminiClient::with_base_url("k", &mock_server.uri());
        let err = client.complete("gemini-1.5-flash", "Hello").await.unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn blocked_prompt_reports_reason() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&mock_server)
            .await;

        let client = GeminiClient::with_base_url("k", &mock_server.uri());
        let err = client.complete("gemini-1.5-flash", "Hello").await.unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::InvalidRequest);
        assert!(err.message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = GeminiClient::with_base_url("k", &mock_server.uri());
        let err = client.complete("gemini-1.5-flash", "Hello").await.unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::Malformed);
    }
}
