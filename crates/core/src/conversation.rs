//! Conversation-related types.

use serde::{Deserialize, Serialize};
use techflow_model::ModelMessage;
pub use techflow_model::Role;

/// A message shown in the chat.
///
/// Messages are immutable once created. A new message is appended to the
/// [`Conversation`] on each turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    role: Role,
    text: String,
    #[serde(default)]
    is_error: bool,
}

impl Message {
    /// Creates a message written by the user.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            is_error: false,
        }
    }

    /// Creates a message written by the assistant.
    #[inline]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            is_error: false,
        }
    }

    /// Creates an assistant message that stands in for a failed reply.
    #[inline]
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(text)
        }
    }

    /// Returns the author of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of this message.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` if this message replaces a failed reply.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

impl From<&Message> for ModelMessage {
    #[inline]
    fn from(msg: &Message) -> Self {
        ModelMessage {
            role: msg.role,
            text: msg.text.clone(),
        }
    }
}

/// The ordered turn history of one chat session.
///
/// A conversation always starts with the greeting seeded by the system,
/// never with a user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates a conversation seeded with an assistant greeting.
    #[inline]
    pub fn with_greeting<S: Into<String>>(greeting: S) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
        }
    }

    /// Appends a message and returns it.
    #[inline]
    pub fn push(&mut self, msg: Message) -> &Message {
        self.messages.push(msg);
        &self.messages[self.messages.len() - 1]
    }

    /// Returns all messages in chronological order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the latest message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the conversation has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_comes_first() {
        let mut conversation = Conversation::with_greeting("Hello!");
        conversation.push(Message::user("Hi"));
        conversation.push(Message::error("Oops"));

        let first = &conversation.messages()[0];
        assert_eq!(first.role(), Role::Assistant);
        assert_eq!(first.text(), "Hello!");
        assert_eq!(conversation.len(), 3);
        assert!(conversation.last().unwrap().is_error());
    }

    #[test]
    fn test_message_json() {
        let msg: Message =
            serde_json::from_str(r#"{ "role": "user", "text": "Hi" }"#)
                .unwrap();
        assert_eq!(msg, Message::user("Hi"));

        let json = serde_json::to_value(Message::error("Sorry")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "assistant",
                "text": "Sorry",
                "isError": true
            })
        );
    }
}
