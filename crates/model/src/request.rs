use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRequest {
    /// The system instructions, if any.
    pub system_instruction: Option<String>,
    /// Prior turns of the conversation, in chronological order.
    pub history: Vec<ModelMessage>,
    /// The new user message or prompt to answer.
    pub prompt: String,
    /// The output mode requested from the model.
    pub response_format: ResponseFormat,
}

impl ModelRequest {
    /// Creates a free-text request with only a prompt.
    #[inline]
    pub fn with_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            system_instruction: None,
            history: vec![],
            prompt: prompt.into(),
            response_format: ResponseFormat::Text,
        }
    }
}

/// The author of a message.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The model side of the conversation.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A complete message in the history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The text of the message.
    pub text: String,
}

impl ModelMessage {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// The output mode of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Text,
    /// Structured output: the model is contracted to return JSON that
    /// conforms to `schema`.
    ///
    /// For most model providers, the schema should typically be a
    /// [JSON schema](https://json-schema.org/).
    Json {
        /// The schema the response must conform to.
        schema: Value,
    },
}
