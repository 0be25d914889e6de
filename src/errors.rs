//! Error types for the monobank-acquiring library.
//!
//! Every fallible operation returns [`MonobankError`]. Callers that need to
//! branch on the failure category should match on [`MonobankError::kind`]
//! rather than on the rendered message.

use crate::payment_errors::PaymentError;
use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used as an opaque `source` for decode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure category of a [`MonobankError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied empty or missing input.
    Validation,
    /// A request payload could not be serialized.
    Encode,
    /// Malformed base64, JSON or key material.
    Decode,
    /// Webhook signature did not verify.
    InvalidSignature,
    /// The HTTP exchange failed before a response was received.
    Transport,
    /// No usable webhook key source and no default token.
    Configuration,
    /// HTTP 400.
    BadRequest,
    /// HTTP 403, the `X-Token` was rejected.
    InvalidCredential,
    /// HTTP 404.
    NotFound,
    /// HTTP 405.
    MethodNotAllowed,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// Any other status, or a 2xx response that could not be used.
    UnexpectedResponse,
    /// Business-level payment failure reported in a status/webhook payload.
    Payment,
}

impl ErrorKind {
    /// Maps a non-2xx HTTP status code to its error kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use monobank_acquiring::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
    /// assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerError);
    /// assert_eq!(ErrorKind::from_status(402), ErrorKind::UnexpectedResponse);
    /// ```
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            403 => ErrorKind::InvalidCredential,
            404 => ErrorKind::NotFound,
            405 => ErrorKind::MethodNotAllowed,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::ServerError,
            _ => ErrorKind::UnexpectedResponse,
        }
    }

    /// Short human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Encode => "encode error",
            ErrorKind::Decode => "decode error",
            ErrorKind::InvalidSignature => "invalid webhook signature",
            ErrorKind::Transport => "transport error",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::InvalidCredential => "invalid token",
            ErrorKind::NotFound => "not found",
            ErrorKind::MethodNotAllowed => "method not allowed",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::ServerError => "server error",
            ErrorKind::UnexpectedResponse => "unexpected response",
            ErrorKind::Payment => "payment error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed HTTP exchange that came back with a non-2xx status.
///
/// `err_code` and `description` are extracted best-effort from the response
/// body; `body` holds at most the first 4096 bytes of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Status-derived category.
    pub kind: ErrorKind,
    /// HTTP method of the request.
    pub method: String,
    /// Request path (without the base URL).
    pub endpoint: String,
    /// HTTP status code.
    pub status_code: u16,
    /// `Content-Type` of the response, if present.
    pub content_type: Option<String>,
    /// Business error code from the body (`errCode`), may be empty.
    pub err_code: String,
    /// Human description from the body, may be empty.
    pub description: String,
    /// Truncated raw response body.
    pub body: Vec<u8>,
    /// Server-requested delay, only for 429 responses with a parseable `Retry-After`.
    pub retry_after: Option<Duration>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: status={}", self.kind, self.status_code)?;
        if !self.method.is_empty() && !self.endpoint.is_empty() {
            write!(f, " {} {}", self.method, self.endpoint)?;
        } else if !self.endpoint.is_empty() {
            write!(f, " endpoint={}", self.endpoint)?;
        }
        if !self.err_code.trim().is_empty() {
            write!(f, " errCode={}", self.err_code.trim())?;
        }
        if !self.description.trim().is_empty() {
            write!(f, " desc={}", self.description.trim())?;
        }
        if let Some(retry_after) = self.retry_after {
            write!(f, " retryAfter={}s", retry_after.as_secs())?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Main error type for monobank acquiring operations.
#[derive(Error, Debug)]
pub enum MonobankError {
    /// Missing or invalid caller input
    #[error("validation error: {op}: {message}")]
    Validation {
        /// Operation that rejected the input
        op: &'static str,
        /// What was wrong
        message: String,
    },

    /// Request payload could not be serialized
    #[error("encode error: {op}: {source}")]
    Encode {
        /// Operation being prepared
        op: &'static str,
        /// Serializer failure
        #[source]
        source: serde_json::Error,
    },

    /// Malformed base64, JSON or key material
    #[error("decode error: {op}: {message}")]
    Decode {
        /// Operation that failed to decode
        op: &'static str,
        /// What could not be decoded
        message: String,
        /// Bounded snippet of the offending input, for diagnostics
        body: Vec<u8>,
        /// Underlying decoder error, when there is one
        #[source]
        source: Option<BoxError>,
    },

    /// Webhook signature verification failed
    #[error("invalid webhook signature: {op}: {message}")]
    InvalidSignature {
        /// Operation that rejected the signature
        op: &'static str,
        /// Reason
        message: String,
    },

    /// The request never produced a response
    #[error("transport error: {op}: {method} {url}: {source}")]
    Transport {
        /// Operation in flight
        op: &'static str,
        /// HTTP method
        method: String,
        /// Full request URL
        url: String,
        /// Transport failure
        #[source]
        source: TransportError,
    },

    /// The configured timeout elapsed before a response was received
    #[error("timeout exceeded: {method} {url}")]
    Timeout {
        /// HTTP method
        method: String,
        /// Full request URL
        url: String,
    },

    /// No usable configuration for the requested operation
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A response that does not match expectations (e.g. empty 2xx body)
    #[error("unexpected response: {op}: {method} {endpoint}: status={status_code}: {message}")]
    UnexpectedResponse {
        /// Operation in flight
        op: &'static str,
        /// HTTP method
        method: String,
        /// Request path
        endpoint: String,
        /// HTTP status code, 0 when no response was received
        status_code: u16,
        /// Description of the mismatch
        message: String,
    },

    /// Non-2xx response from the API
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Business-level payment failure
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl MonobankError {
    pub(crate) fn validation(op: &'static str, message: impl Into<String>) -> Self {
        MonobankError::Validation {
            op,
            message: message.into(),
        }
    }

    pub(crate) fn decode(
        op: &'static str,
        message: impl Into<String>,
        body: Vec<u8>,
        source: Option<BoxError>,
    ) -> Self {
        MonobankError::Decode {
            op,
            message: message.into(),
            body,
            source,
        }
    }

    pub(crate) fn invalid_signature(op: &'static str, message: impl Into<String>) -> Self {
        MonobankError::InvalidSignature {
            op,
            message: message.into(),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MonobankError::Validation { .. } => ErrorKind::Validation,
            MonobankError::Encode { .. } => ErrorKind::Encode,
            MonobankError::Decode { .. } => ErrorKind::Decode,
            MonobankError::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            MonobankError::Transport { .. } | MonobankError::Timeout { .. } => {
                ErrorKind::Transport
            }
            MonobankError::Configuration(_) => ErrorKind::Configuration,
            MonobankError::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            MonobankError::Api(err) => err.kind,
            MonobankError::Payment(_) => ErrorKind::Payment,
        }
    }

    /// Returns the API error details for non-2xx responses.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            MonobankError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Server-requested delay before retrying, if the API sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        self.api_error().and_then(|err| err.retry_after)
    }

    /// Whether the request timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            MonobankError::Timeout { .. } => true,
            MonobankError::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Whether retrying the same call later may succeed.
    ///
    /// The library never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::RateLimited | ErrorKind::ServerError
        )
    }
}

/// Result type alias for monobank acquiring operations.
pub type Result<T> = std::result::Result<T, MonobankError>;
