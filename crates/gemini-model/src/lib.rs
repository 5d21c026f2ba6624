//! A model provider for the Gemini `generateContent` API.
//!
//! Requests are always sent to the streaming endpoint, and the reply is
//! delivered as text deltas read from server-sent events.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, StatusCode, header};
use techflow_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{GeminiConfig, GeminiConfigBuilder};
use io::{Chunks, Sse};
use proto::{ApiError, ErrorBody};
use response::GeminiResponse;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        let kind = match err.status.as_deref() {
            Some("RESOURCE_EXHAUSTED") => ErrorKind::RateLimitExceeded,
            Some("UNAUTHENTICATED" | "PERMISSION_DENIED") => {
                ErrorKind::Unauthorized
            }
            _ => err.code.map_or(ErrorKind::Other, kind_for_status_code),
        };
        let message = err
            .message
            .unwrap_or_else(|| "unknown error from the service".to_owned());
        Self::new(message, kind)
    }
}

#[inline]
fn kind_for_status_code(code: u16) -> ErrorKind {
    match code {
        401 | 403 => ErrorKind::Unauthorized,
        429 => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    }
}

/// Gemini model provider.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;
    type Response = GeminiResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req);
        let resp_fut = self
            .client
            .post(self.config.stream_url())
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
            .send();
        let model = self.config.model.clone();

        async move {
            debug!("sending request to {model}");
            let resp = resp_fut
                .await
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(error_from_response(status, resp).await);
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| {
                    m.type_() == mime::TEXT && m.subtype() == "event-stream"
                })
                .unwrap_or(false);
            if !is_event_stream {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::Other,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(GeminiResponse::from_sse(sse))
        }
    }
}

async fn error_from_response(
    status: StatusCode,
    resp: reqwest::Response,
) -> Error {
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { error }) => {
            let err = Error::from(error);
            warn!("service returned {status}: {}", err.message());
            err
        }
        Err(_) => {
            warn!("service returned {status} with an unrecognized body");
            Error::new(
                format!("HTTP {status}"),
                kind_for_status_code(status.as_u16()),
            )
        }
    }
}
