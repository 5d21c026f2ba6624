use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A reply being received from the model provider.
///
/// The reply arrives as a stream of [`ModelResponseEvent`]s: zero or more
/// text deltas followed by exactly one `Completed` event.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error reported while receiving the reply.
    type Error: ModelProviderError;

    /// Polls for the next event of the reply.
    ///
    /// Returns `Poll::Ready(Ok(None))` once the stream is exhausted, and
    /// keeps returning it on later calls. `Poll::Pending` registers the
    /// waker in `cx` like any other poll function. An `Err` ends the
    /// reply; whatever text was delivered before it is incomplete.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the provider stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// Generation ended normally.
    Stop,
    /// The output token limit was reached.
    MaxTokens,
    /// The prompt or the output was blocked by a content policy.
    Blocked,
    /// Any other reason reported by the provider.
    Other,
}

/// One step of a [`ModelResponse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// No more text will follow.
    Completed(ModelFinishReason),
    /// Received a piece of the reply text.
    TextDelta(String),
}
