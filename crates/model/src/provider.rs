use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error raised by a provider, classified by [`ErrorKind`].
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns how the failure is classified.
    fn kind(&self) -> ErrorKind;
}

/// The gateway to a generative-AI service.
///
/// Clients treat a provider as stateless and share it between calls, so
/// it must not keep per-conversation state.
pub trait ModelProvider: Send + Sync {
    /// Raised when a request cannot be sent or its reply cannot be read.
    type Error: ModelProviderError;

    /// The streamed reply to one request.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts one request.
    ///
    /// Each call issues exactly one outbound request. Providers must not
    /// retry on their own.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
