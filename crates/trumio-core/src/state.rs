//! UI-agnostic conversation state
//!
//! The transcript and screen mode live here. Nothing in this module talks to
//! the network; the dispatcher hands finished exchanges to
//! [`Conversation::append_exchange`].

use serde::{Deserialize, Serialize};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Which of the two screens is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Landing,
    Chat,
}

/// Ordered transcript plus screen mode.
///
/// `mode` is `Chat` exactly when an exchange has been appended since the last
/// reset. Messages always arrive in user/assistant pairs.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    mode: Mode,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message followed by its reply and switch to the chat screen.
    pub fn append_exchange(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        let user_text = user_text.into();
        debug_assert!(!user_text.trim().is_empty(), "exchange without user text");

        self.messages.reserve(2);
        self.messages.push(ChatMessage::user(user_text));
        self.messages.push(ChatMessage::assistant(assistant_text));
        self.mode = Mode::Chat;
    }

    /// Start a new chat: empty transcript, landing screen.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.mode = Mode::Landing;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_empty_on_landing() {
        let conversation = Conversation::new();
        assert!(conversation.is_empty());
        assert_eq!(conversation.mode(), Mode::Landing);
    }

    #[test]
    fn append_exchange_pushes_user_then_assistant() {
        let mut conversation = Conversation::new();
        conversation.append_exchange("Hello", "Hi there");

        assert_eq!(
            conversation.messages(),
            &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi there")]
        );
        assert_eq!(conversation.mode(), Mode::Chat);
    }

    #[test]
    fn reset_after_two_exchanges_returns_to_landing() {
        let mut conversation = Conversation::new();
        conversation.append_exchange("one", "first");
        conversation.append_exchange("two", "second");
        assert_eq!(conversation.len(), 4);

        conversation.reset();

        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.mode(), Mode::Landing);
    }

    #[test]
    fn message_serializes_with_role() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"Assistant","content":"ok"}"#);
    }

    fn arb_exchange() -> impl Strategy<Value = (String, String)> {
        ("[a-zA-Z0-9?!]{1}[a-zA-Z0-9 ?!]{0,30}", "[a-zA-Z0-9 .]{0,40}")
    }

    proptest! {
        #[test]
        fn roles_alternate_in_insertion_order(exchanges in prop::collection::vec(arb_exchange(), 1..8)) {
            let mut conversation = Conversation::new();
            for (user, reply) in &exchanges {
                let before = conversation.len();
                conversation.append_exchange(user.clone(), reply.clone());
                prop_assert_eq!(conversation.len(), before + 2);
            }

            for (i, (user, reply)) in exchanges.iter().enumerate() {
                prop_assert_eq!(&conversation.messages()[2 * i], &ChatMessage::user(user.clone()));
                prop_assert_eq!(&conversation.messages()[2 * i + 1], &ChatMessage::assistant(reply.clone()));
            }
            prop_assert_eq!(conversation.mode(), Mode::Chat);
        }

        #[test]
        fn reset_always_lands(exchanges in prop::collection::vec(arb_exchange(), 0..5)) {
            let mut conversation = Conversation::new();
            for (user, reply) in exchanges {
                conversation.append_exchange(user, reply);
            }

            conversation.reset();

            prop_assert!(conversation.is_empty());
            prop_assert_eq!(conversation.mode(), Mode::Landing);
        }
    }
}
