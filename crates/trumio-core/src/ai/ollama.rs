use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{truncate_detail, CompletionService};
use crate::error::ServiceError;
use crate::provider::Provider;

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn query(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("Ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let mut err = ServiceError::from_status("Ollama", status.as_u16(), &truncate_detail(&text));
            err.message.push_str(". Make sure Ollama is running with: ollama serve");
            return Err(err);
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest("Ollama", e))?;
        Ok(ollama_response.response)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ServiceError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest("Ollama", e))?;

        if !response.status().is_success() {
            return Err(ServiceError::from_status("Ollama", response.status().as_u16(), "failed to list models"));
        }

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest("Ollama", e))?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    fn provider(&self) -> Provider {
        Provider::Ollama
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
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn generate_is_not_streamed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(json!({"model": "llama3.2:latest", "prompt": "Hello", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Hi there",
                "done": true
            })))
            .mount(&mock_server)
            .await;

        let client = OllamaClient::new(&mock_server.uri());
        assert_eq!(client.complete("llama3.2:latest", "Hello").await.unwrap(), "Hi there");
    }

    #[tokio::test]
    async fn lists_model_names() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "llama3.2:latest"}, {"name": "gemma3:latest"}]
            })))
            .mount(&mock_server)
            .await;

        let client = OllamaClient::new(&format!("{}/", mock_server.uri()));
        let models = client.list_models().await.unwrap();

        assert_eq!(models, vec!["llama3.2:latest", "gemma3:latest"]);
    }

    #[tokio::test]
    async fn server_error_mentions_ollama_serve() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&mock_server)
            .await;

        let client = OllamaClient::new(&mock_server.uri());
        let err = client.complete("llama3.2:latest", "Hello").await.unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::Server);
        assert!(err.message.contains("ollama serve"));
    }
}
