pub mod ai;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod provider;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{
    build_service, service_or_unconfigured, static_models, ClaudeClient, CompletionService, GeminiClient,
    OllamaClient, OpenAIClient, Unconfigured,
};
pub use config::{Config, KeySource};
pub use dispatcher::{DispatchState, Dispatcher, Exchange};
pub use error::{ServiceError, ServiceErrorKind, SubmitError};
pub use provider::Provider;
pub use session::{Session, EXAMPLE_PROMPTS};
pub use state::{ChatMessage, ChatRole, Conversation, Mode};
