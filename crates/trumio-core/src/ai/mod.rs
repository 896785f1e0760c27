pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::ServiceError;
use crate::provider::Provider;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

/// A hosted (or local) model that turns one prompt into one reply.
///
/// Implementations receive no conversation history; every call stands alone.
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ServiceError>;
}

/// Build the client for `provider` from resolved configuration.
pub fn build_service(provider: Provider, config: &Config) -> Result<Arc<dyn CompletionService>, ServiceError> {
    let service: Arc<dyn CompletionService> = match provider {
        Provider::Gemini => Arc::new(GeminiClient::new(&require_key(provider, config)?)),
        Provider::Ollama => Arc::new(OllamaClient::new(config.ollama_url())),
        Provider::Claude => Arc::new(ClaudeClient::new(&require_key(provider, config)?)),
        Provider::OpenAI => Arc::new(OpenAIClient::new(&require_key(provider, config)?)),
    };
    Ok(service)
}

fn require_key(provider: Provider, config: &Config) -> Result<String, ServiceError> {
    config
        .api_key(provider)
        .map(|(key, _)| key)
        .ok_or_else(|| {
            ServiceError::missing_credential(format!(
                "{} API key not configured. Set {} or press 'P' to enter one.",
                provider.short_name(),
                provider.key_env_vars().join(" / ")
            ))
        })
}

/// Stand-in used when the selected provider has no key yet.
///
/// Every call fails with the credential error, so the UI shows it in place of
/// a reply and the draft stays put.
pub struct Unconfigured {
    provider: Provider,
    error: ServiceError,
}

impl Unconfigured {
    pub fn new(provider: Provider, error: ServiceError) -> Self {
        Self { provider, error }
    }
}

#[async_trait]
impl CompletionService for Unconfigured {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ServiceError> {
        Err(self.error.clone())
    }
}

/// Like [`build_service`], but never fails: a missing key becomes [`Unconfigured`].
pub fn service_or_unconfigured(provider: Provider, config: &Config) -> Arc<dyn CompletionService> {
    build_service(provider, config).unwrap_or_else(|e| Arc::new(Unconfigured::new(provider, e)))
}

/// Models offered in the picker when the provider has a fixed catalogue
pub fn static_models(provider: Provider) -> Vec<String> {
    match provider {
        Provider::Gemini => GeminiClient::list_models(),
        Provider::Claude => ClaudeClient::list_models(),
        Provider::OpenAI => OpenAIClient::list_models(),
        Provider::Ollama => Vec::new(),
    }
}

/// Provider error bodies are often long JSON blobs; keep the notice readable.
pub(crate) fn truncate_detail(text: &str) -> String {
    const MAX: usize = 300;
    let text = text.trim();
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    }
}
