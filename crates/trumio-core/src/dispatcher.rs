//! Request dispatch: one prompt in flight at a time.
//!
//! `submit` validates the draft and spawns the completion call on the tokio
//! runtime. The caller's event loop later collects the outcome with
//! [`Dispatcher::try_finish`] (non-blocking) or [`Dispatcher::finish`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::CompletionService;
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::{ServiceError, SubmitError};
use crate::provider::Provider;

/// A prompt and the reply it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub prompt: String,
    pub reply: String,
}

pub type Outcome = Result<Exchange, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    AwaitingResponse,
}

struct InFlight {
    prompt: String,
    task: JoinHandle<Result<String, ServiceError>>,
}

pub struct Dispatcher {
    service: Arc<dyn CompletionService>,
    model: String,
    timeout: Duration,
    in_flight: Option<InFlight>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            in_flight: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject drafts that are empty once whitespace is stripped
    pub fn validate(draft: &str) -> Result<&str, SubmitError> {
        if draft.trim().is_empty() {
            Err(SubmitError::Validation)
        } else {
            Ok(draft)
        }
    }

    /// Start the completion call for `draft`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, draft: &str) -> Result<(), SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::Busy);
        }
        let prompt = Self::validate(draft)?.to_string();

        info!(
            provider = self.service.provider().as_str(),
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "dispatching prompt"
        );

        let service = Arc::clone(&self.service);
        let model = self.model.clone();
        let timeout = self.timeout;
        let task_prompt = prompt.clone();
        let task = tokio::spawn(async move {
            match tokio::time::timeout(timeout, service.complete(&model, &task_prompt)).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::timeout(format!(
                    "No reply from {} after {}s",
                    service.provider().short_name(),
                    timeout.as_secs()
                ))),
            }
        });

        self.in_flight = Some(InFlight { prompt, task });
        Ok(())
    }

    pub fn state(&self) -> DispatchState {
        if self.in_flight.is_some() {
            DispatchState::AwaitingResponse
        } else {
            DispatchState::Idle
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.state() == DispatchState::AwaitingResponse
    }

    /// Collect the outcome if the in-flight call has completed
    pub async fn try_finish(&mut self) -> Option<Outcome> {
        match &self.in_flight {
            Some(in_flight) if in_flight.task.is_finished() => self.finish().await,
            _ => None,
        }
    }

    /// Wait for the in-flight call, if any
    pub async fn finish(&mut self) -> Option<Outcome> {
        let InFlight { prompt, task } = self.in_flight.take()?;

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(ServiceError::unknown(format!("Request task failed: {e}"))),
        };

        Some(match result {
            Ok(reply) => {
                debug!(reply_chars = reply.chars().count(), "completion received");
                Ok(Exchange { prompt, reply })
            }
            Err(e) => {
                warn!(kind = e.kind.label(), error = %e, "completion failed");
                Err(e)
            }
        })
    }

    /// Drop the in-flight call without waiting for it
    pub fn abort(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            info!("aborting in-flight request");
            in_flight.task.abort();
        }
    }

    pub fn provider(&self) -> Provider {
        self.service.provider()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Swap the backing service. A call already in flight keeps the old one.
    pub fn set_service(&mut self, service: Arc<dyn CompletionService>, model: impl Into<String>) {
        self.service = service;
        self.model = model.into();
        info!(provider = self.service.provider().as_str(), model = %self.model, "service changed");
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct Recording {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CompletionService for Recording {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn complete(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
            self.prompts.lock().unwrap().push((model.to_string(), prompt.to_string()));
            Ok(format!("re: {prompt}"))
        }
    }

    struct Gated {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl CompletionService for Gated {
        fn provider(&self) -> Provider {
            Provider::Ollama
        }

        async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ServiceError> {
            self.gate.notified().await;
            Ok("released".to_string())
        }
    }

    #[tokio::test]
    async fn passes_prompt_and_model_verbatim() {
        let service = Arc::new(Recording { prompts: Mutex::new(Vec::new()) });
        let mut dispatcher = Dispatcher::new(service.clone(), "gemini-1.5-flash");

        dispatcher.submit("  Hello  ").unwrap();
        let exchange = dispatcher.finish().await.unwrap().unwrap();

        assert_eq!(exchange.prompt, "  Hello  ");
        assert_eq!(exchange.reply, "re:   Hello  ");
        assert_eq!(
            service.prompts.lock().unwrap().as_slice(),
            &[("gemini-1.5-flash".to_string(), "  Hello  ".to_string())]
        );
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[tokio::test]
    async fn second_submit_while_awaiting_is_busy() {
        let gate = Arc::new(Notify::new());
        let mut dispatcher = Dispatcher::new(Arc::new(Gated { gate: gate.clone() }), "m");

        dispatcher.submit("first").unwrap();
        assert!(dispatcher.is_awaiting());
        assert!(matches!(dispatcher.submit("second"), Err(SubmitError::Busy)));
        assert!(dispatcher.try_finish().await.is_none());

        gate.notify_one();
        let exchange = dispatcher.finish().await.unwrap().unwrap();
        assert_eq!(exchange.prompt, "first");
        assert!(!dispatcher.is_awaiting());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let gate = Arc::new(Notify::new());
        let mut dispatcher = Dispatcher::new(Arc::new(Gated { gate }), "m")
            .with_timeout(Duration::from_millis(20));

        dispatcher.submit("hello").unwrap();
        let err = dispatcher.finish().await.unwrap().unwrap_err();

        assert_eq!(err.kind, ServiceErrorKind::Timeout);
    }

    #[tokio::test]
    async fn abort_returns_to_idle() {
        let gate = Arc::new(Notify::new());
        let mut dispatcher = Dispatcher::new(Arc::new(Gated { gate }), "m");

        dispatcher.submit("hello").unwrap();
        dispatcher.abort();

        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert!(dispatcher.finish().await.is_none());
    }

    #[tokio::test]
    async fn empty_draft_never_reaches_service() {
        let service = Arc::new(Recording { prompts: Mutex::new(Vec::new()) });
        let mut dispatcher = Dispatcher::new(service.clone(), "m");

        assert!(matches!(dispatcher.submit(" \t "), Err(SubmitError::Validation)));
        assert!(!dispatcher.is_awaiting());
        assert!(service.prompts.lock().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn whitespace_only_drafts_fail_validation(draft in "[ \t\n\r]{0,12}") {
            prop_assert!(matches!(Dispatcher::validate(&draft), Err(SubmitError::Validation)));
        }

        #[test]
        fn drafts_with_text_pass_validation(pad in "[ \t]{0,4}", text in "[a-zA-Z0-9?]{1,20}") {
            let draft = format!("{pad}{text}{pad}");
            prop_assert_eq!(Dispatcher::validate(&draft).ok(), Some(draft.as_str()));
        }
    }
}
