use serde::{Deserialize, Serialize};
use techflow_model::{ErrorKind, ModelFinishReason};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "text_delta")]
    TextDelta(String),
}

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// The finish reason reported after all events, `Stop` if unset.
    #[serde(default)]
    pub finish_reason: Option<ModelFinishReason>,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    #[serde(default)]
    pub failures: Option<u64>,
    /// The kind of the simulated failures, `Other` if unset.
    #[serde(default)]
    pub failure_kind: Option<ErrorKind>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            finish_reason: None,
            failures: None,
            failure_kind: None,
        }
    }

    /// Creates a `PresetResponse` that replies with a single text.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::TextDelta(text.into())])
    }

    /// Creates a `PresetResponse` that always fails with `kind`.
    #[inline]
    pub fn failing(kind: ErrorKind) -> Self {
        Self::with_events(Vec::<PresetEvent>::new())
            .with_failures(0)
            .with_failure_kind(kind)
    }

    /// Sets the finish reason.
    #[inline]
    pub fn with_finish_reason(mut self, reason: ModelFinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Sets the kind of the simulated failures.
    #[inline]
    pub fn with_failure_kind(mut self, kind: ErrorKind) -> Self {
        self.failure_kind = Some(kind);
        self
    }
}
