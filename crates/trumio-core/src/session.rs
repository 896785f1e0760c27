//! A chat session: transcript, draft, and dispatcher wired together.
//!
//! The user message and the reply are appended in one step only after the
//! reply arrives, so a failed call never leaves half an exchange behind.

use tracing::info;

use crate::dispatcher::{Dispatcher, Outcome};
use crate::error::{ServiceError, SubmitError};
use crate::state::{Conversation, Mode};

/// Example prompts offered on the landing screen
pub const EXAMPLE_PROMPTS: [&str; 4] = [
    "Find the Computer Science Companies for me.",
    "I want to know educational background of Mr. Ratan Tata.",
    "Is there any Job updates for me?",
    "Find the Business analyst profiles for me.",
];

pub struct Session {
    conversation: Conversation,
    draft: String,
    dispatcher: Dispatcher,
    notice: Option<String>,
    last_error: Option<ServiceError>,
}

impl Session {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            conversation: Conversation::new(),
            draft: String::new(),
            dispatcher,
            notice: None,
            last_error: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn mode(&self) -> Mode {
        self.conversation.mode()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Editable draft. Callers should not edit while a request is in flight.
    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn is_awaiting(&self) -> bool {
        self.dispatcher.is_awaiting()
    }

    /// Blocking notice for the user (empty draft)
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Failure from the most recent request, kept until the next submit or reset
    pub fn last_error(&self) -> Option<&ServiceError> {
        self.last_error.as_ref()
    }

    /// Send the current draft
    pub fn submit(&mut self) -> Result<(), SubmitError> {
        match self.dispatcher.submit(&self.draft) {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(SubmitError::Validation) => {
                self.notice = Some(SubmitError::Validation.to_string());
                Err(SubmitError::Validation)
            }
            Err(e) => Err(e),
        }
    }

    /// Fill the draft with one of the landing-screen examples and send it
    pub fn submit_example(&mut self, index: usize) -> Result<(), SubmitError> {
        if self.is_awaiting() {
            return Err(SubmitError::Busy);
        }
        let Some(prompt) = EXAMPLE_PROMPTS.get(index) else {
            return Err(SubmitError::Validation);
        };
        self.draft = prompt.to_string();
        self.submit()
    }

    /// Apply a finished request, if there is one. Never blocks.
    pub async fn poll(&mut self) -> Option<Result<(), ServiceError>> {
        let outcome = self.dispatcher.try_finish().await?;
        Some(self.apply(outcome))
    }

    /// Wait for the in-flight request and apply it
    pub async fn wait(&mut self) -> Option<Result<(), ServiceError>> {
        let outcome = self.dispatcher.finish().await?;
        Some(self.apply(outcome))
    }

    fn apply(&mut self, outcome: Outcome) -> Result<(), ServiceError> {
        match outcome {
            Ok(exchange) => {
                self.conversation.append_exchange(exchange.prompt, exchange.reply);
                self.draft.clear();
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// New chat. Any in-flight request is dropped; the draft is kept.
    pub fn reset(&mut self) {
        self.dispatcher.abort();
        self.conversation.reset();
        self.notice = None;
        self.last_error = None;
        info!("conversation reset");
    }
}
