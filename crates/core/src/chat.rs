//! The support chat assistant.

use techflow_model::{
    ModelFinishReason, ModelMessage, ModelProvider, ModelRequest,
    ResponseFormat,
};

use crate::conversation::Message;
use crate::error::Error;
use crate::model_client::ModelClient;

/// Persona, grounding manual and fallback policy of the assistant.
pub const SYSTEM_INSTRUCTION: &str =
    include_str!("./prompts/assistant_system.md");

/// Turns a conversation history plus a new utterance into one provider call.
///
/// The client holds no conversation state. The caller owns the history and
/// appends the new turn and the reply to it.
#[derive(Clone)]
pub struct ConversationClient {
    model_client: ModelClient,
    system_instruction: String,
}

impl ConversationClient {
    /// Creates a client backed by `provider`, using [`SYSTEM_INSTRUCTION`].
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_instruction: SYSTEM_INSTRUCTION.to_owned(),
        }
    }

    /// Replaces the system instruction.
    #[inline]
    pub fn with_system_instruction<S: Into<String>>(
        mut self,
        system_instruction: S,
    ) -> Self {
        self.system_instruction = system_instruction.into();
        self
    }

    /// Sends `utterance` as the next user turn and returns the reply text
    /// unmodified.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `utterance` is blank; no call is made.
    /// - `TransportFailure` if the provider call fails. It is not retried.
    /// - `EmptyResponse` if the provider returns no text.
    pub async fn send_turn(
        &self,
        utterance: &str,
        prior_history: &[Message],
    ) -> Result<String, Error> {
        self.send_turn_streaming(utterance, prior_history, |_| {})
            .await
    }

    /// Like [`send_turn`](Self::send_turn), but reports every piece of the
    /// reply to `on_delta` as it arrives.
    pub async fn send_turn_streaming(
        &self,
        utterance: &str,
        prior_history: &[Message],
        on_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<String, Error> {
        if utterance.trim().is_empty() {
            return Err(
                Error::invalid_input().with_reason("utterance is empty")
            );
        }

        let request = self.build_request(utterance, prior_history);
        debug!(
            "sending chat turn with {} prior messages",
            request.history.len()
        );

        let resp = self
            .model_client
            .send_request(request, on_delta)
            .await
            .map_err(|err| {
                Error::transport_failure(err.kind())
                    .with_reason(err.to_string())
            })?;

        if resp.text.is_empty() {
            let reason = match resp.finish_reason {
                Some(ModelFinishReason::Blocked) => {
                    "reply blocked by the provider"
                }
                _ => "provider returned no text",
            };
            warn!("empty chat reply: {reason}");
            return Err(Error::empty_response().with_reason(reason));
        }
        Ok(resp.text)
    }

    fn build_request(
        &self,
        utterance: &str,
        prior_history: &[Message],
    ) -> ModelRequest {
        ModelRequest {
            system_instruction: Some(self.system_instruction.clone()),
            history: prior_history.iter().map(ModelMessage::from).collect(),
            prompt: utterance.to_owned(),
            response_format: ResponseFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use techflow_model::{ErrorKind as ProviderErrorKind, Role};
    use techflow_test_model::{PresetEvent, PresetResponse, TestModelProvider};

    use super::*;
    use crate::ErrorKind;
    use crate::conversation::Conversation;

    fn sample_history() -> Conversation {
        let mut conversation = Conversation::with_greeting(
            "Hello! How can I help you with your X-2000 device today?",
        );
        conversation.push(Message::user("What does E-404 mean?"));
        conversation.push(Message::assistant("No connectivity."));
        conversation.push(Message::user("And E-500?"));
        conversation.push(Message::error("Connection error"));
        conversation
    }

    #[tokio::test]
    async fn test_send_turn_threads_history() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text(
            "  Turn it off and let it cool for 30 minutes.\n",
        ));
        let client = ConversationClient::new(provider.clone());

        let history = sample_history();
        let reply = client
            .send_turn("My device is burning hot", history.messages())
            .await
            .unwrap();
        // Returned unmodified, surrounding whitespace included.
        assert_eq!(reply, "  Turn it off and let it cool for 30 minutes.\n");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.prompt, "My device is burning hot");
        assert_eq!(request.response_format, ResponseFormat::Text);
        assert_eq!(request.history.len(), history.len());
        for (sent, msg) in request.history.iter().zip(history.messages()) {
            assert_eq!(sent.role, msg.role());
            assert_eq!(sent.text, msg.text());
        }
        assert_eq!(request.history[0].role, Role::Assistant);

        let instruction = request.system_instruction.as_deref().unwrap();
        assert!(instruction.contains("E-500: Overheating"));
        assert!(instruction.contains("open a ticket for second-level support"));

        // The caller's history is untouched.
        assert_eq!(history, sample_history());
    }

    #[tokio::test]
    async fn test_empty_history() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("Hi!"));
        let client = ConversationClient::new(provider.clone())
            .with_system_instruction("Be brief.");

        let reply = client.send_turn("Hello", &[]).await.unwrap();
        assert_eq!(reply, "Hi!");
        let request = &provider.requests()[0];
        assert!(request.history.is_empty());
        assert_eq!(request.system_instruction.as_deref(), Some("Be brief."));
    }

    #[tokio::test]
    async fn test_blank_utterance() {
        let provider = TestModelProvider::default();
        let client = ConversationClient::new(provider.clone());

        let err = client.send_turn(" \n\t", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::failing(
            ProviderErrorKind::RateLimitExceeded,
        ));
        let client = ConversationClient::new(provider.clone());

        let err = client
            .send_turn("Hello", sample_history().messages())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert_eq!(
            err.provider_kind(),
            Some(ProviderErrorKind::RateLimitExceeded)
        );
        // No retry is performed.
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events(
            Vec::<PresetEvent>::new(),
        ));
        provider.add_response(
            PresetResponse::with_events(Vec::<PresetEvent>::new())
                .with_finish_reason(ModelFinishReason::Blocked),
        );
        let client = ConversationClient::new(provider);

        let err = client.send_turn("Hello", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        let err = client.send_turn("Hello", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.reason(), "reply blocked by the provider");
    }

    #[tokio::test]
    async fn test_streaming_deltas() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::TextDelta("Go to Settings ".to_owned()),
            PresetEvent::TextDelta("> System > Update.".to_owned()),
        ]));
        let client = ConversationClient::new(provider);

        let deltas = Arc::new(Mutex::new(String::new()));
        let reply = client
            .send_turn_streaming("How do I update?", &[], {
                let deltas = Arc::clone(&deltas);
                move |delta| deltas.lock().unwrap().push_str(delta)
            })
            .await
            .unwrap();
        assert_eq!(reply, "Go to Settings > System > Update.");
        assert_eq!(*deltas.lock().unwrap(), reply);
    }
}
