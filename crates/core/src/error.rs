use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use techflow_model::ErrorKind as ProviderErrorKind;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input was rejected before any provider call was made.
    InvalidInput,
    /// The provider call could not complete (network, auth, rate limit).
    TransportFailure,
    /// The call completed but returned no text.
    EmptyResponse,
    /// Text was returned but violates the structured-output contract.
    MalformedResponse,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::TransportFailure => write!(f, "Transport failure"),
            ErrorKind::EmptyResponse => write!(f, "Empty response"),
            ErrorKind::MalformedResponse => write!(f, "Malformed response"),
        }
    }
}

/// Describes a failed client call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    provider_kind: Option<ProviderErrorKind>,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn with_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            provider_kind: None,
            reason: None,
        }
    }

    /// Creates a new error with the `InvalidInput` kind.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::with_kind(ErrorKind::InvalidInput)
    }

    /// Creates a new error with the `TransportFailure` kind, keeping the
    /// kind reported by the provider.
    #[inline]
    pub fn transport_failure(provider_kind: ProviderErrorKind) -> Self {
        Self {
            provider_kind: Some(provider_kind),
            ..Self::with_kind(ErrorKind::TransportFailure)
        }
    }

    /// Creates a new error with the `EmptyResponse` kind.
    #[inline]
    pub fn empty_response() -> Self {
        Self::with_kind(ErrorKind::EmptyResponse)
    }

    /// Creates a new error with the `MalformedResponse` kind.
    #[inline]
    pub fn malformed_response() -> Self {
        Self::with_kind(ErrorKind::MalformedResponse)
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the provider error kind, only set for transport failures.
    #[inline]
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        self.provider_kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, self.provider_kind) {
            (Some(reason), Some(provider_kind)) => {
                write!(f, "{} ({provider_kind}): {reason}", self.kind)
            }
            (Some(reason), None) => write!(f, "{}: {reason}", self.kind),
            (None, Some(provider_kind)) => {
                write!(f, "{} ({provider_kind})", self.kind)
            }
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::transport_failure(ProviderErrorKind::RateLimitExceeded)
            .with_reason("quota exceeded");
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert_eq!(
            err.to_string(),
            "Transport failure (Rate limit exceeded): quota exceeded"
        );

        let err = Error::empty_response();
        assert_eq!(err.provider_kind(), None);
        assert_eq!(err.reason(), "Empty response");
        assert_eq!(err.to_string(), "Empty response");
    }
}
