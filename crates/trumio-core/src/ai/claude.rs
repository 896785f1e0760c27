use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{truncate_detail, CompletionService};
use crate::error::ServiceError;
use crate::provider::Provider;

const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, CLAUDE_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn query(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens: 4096,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("Claude", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status("Claude", status.as_u16(), &truncate_detail(&text)));
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest("Claude", e))?;
        let text: String = claude_response.content.into_iter().map(|c| c.text).collect();
        if text.is_empty() {
            return Err(ServiceError::malformed("Claude returned no text"));
        }
        Ok(text)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
            "claude-3-opus-20240229".to_string(),
        ]
    }
}

#[async_trait]
impl CompletionService for ClaudeClient {
    fn provider(&self) -> Provider {
        Provider::Claude
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
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn claude_response_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"text": "This is a test response", "type": "text"}],
                "usage": {"input_tokens": 10, "output_tokens": 20}
            })))
            .mount(&mock_server)
            .await;

        let client = ClaudeClient::with_base_url("test-api-key", &mock_server.uri());
        let reply = client.complete("claude-3-5-haiku-20241022", "Hello").await.unwrap();

        assert_eq!(reply, "This is a test response");
    }

    #[tokio::test]
    async fn overloaded_is_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let client = ClaudeClient::with_base_url("k", &mock_server.uri());
        let err = client.complete("claude-3-5-haiku-20241022", "Hello").await.unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::Server);
    }
}
