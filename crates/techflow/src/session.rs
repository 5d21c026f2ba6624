use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry;
use techflow_core::{
    Conversation, ConversationClient, Error, ErrorKind, Message,
};
use techflow_model::ModelProvider;

/// The assistant message every session starts with.
pub const GREETING: &str = "Hello! I am your TechFlow virtual assistant. \
    How can I help you with your X-2000 device today?";

/// The assistant message appended in place of a failed reply.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, a connection error occurred. Please try again later.";

/// A chat session, like a window that displays messages and has a input box.
///
/// The session owns the [`Conversation`] and appends both sides of every
/// turn to it. Sending takes `&mut self`, so a session never has more than
/// one turn in flight.
pub struct ChatSession {
    client: ConversationClient,
    conversation: Conversation,
    max_retry_elapsed: Option<Duration>,
}

impl ChatSession {
    /// Creates a session that talks through `client`.
    pub fn new(client: ConversationClient) -> Self {
        Self {
            client,
            conversation: Conversation::with_greeting(GREETING),
            max_retry_elapsed: None,
        }
    }

    /// Creates a session with a specified model provider.
    #[inline]
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self::new(ConversationClient::new(provider))
    }

    /// Retries turns that fail with `TransportFailure`, backing off
    /// exponentially until `max_elapsed` has passed.
    ///
    /// Retry is disabled by default.
    #[inline]
    pub fn with_retry(mut self, max_elapsed: Duration) -> Self {
        self.max_retry_elapsed = Some(max_elapsed);
        self
    }

    /// Returns the conversation so far, greeting first.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Sends a message to the session.
    ///
    /// Returns `None` without doing anything if `input` is blank. Otherwise
    /// the user message is appended as typed, followed by either the reply
    /// or [`FALLBACK_REPLY`] flagged as an error. The fallback is already in
    /// the conversation when `Some(Err(_))` is returned.
    pub async fn send_message(
        &mut self,
        input: &str,
    ) -> Option<Result<&Message, Error>> {
        if input.trim().is_empty() {
            return None;
        }

        let reply = self.request_reply(input).await;
        self.conversation.push(Message::user(input));

        Some(match reply {
            Ok(text) => Ok(self.conversation.push(Message::assistant(text))),
            Err(err) => {
                warn!("chat turn failed: {err}");
                self.conversation.push(Message::error(FALLBACK_REPLY));
                Err(err)
            }
        })
    }

    async fn request_reply(&self, input: &str) -> Result<String, Error> {
        // The new user message is not in the history yet.
        let client = &self.client;
        let history = self.conversation.messages();

        let Some(max_elapsed) = self.max_retry_elapsed else {
            return client.send_turn(input, history).await;
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(max_elapsed))
            .build();
        retry(policy, || async move {
            client.send_turn(input, history).await.map_err(|err| {
                if err.kind() == ErrorKind::TransportFailure {
                    debug!("retrying chat turn: {err}");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        })
        .await
    }
}
