//! HTTP transport used by the client.
//!
//! The client only needs "execute a request, hand back status, headers and
//! body". [`HttpTransport`] captures exactly that so tests and embedding
//! applications can substitute their own implementation; [`ReqwestTransport`]
//! is the default.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute request URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Serialized body, if any
    pub body: Option<Vec<u8>>,
}

/// A completed HTTP exchange as seen by the response classifier.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Sets the response body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_bytes()),
            reqwest::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Returns a header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Content-Type` of the response.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Whether the status is in `200..300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to obtain any response from the server.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    timeout: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a transport error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
            source: None,
        }
    }

    /// Creates a transport error that represents an elapsed timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: true,
            source: None,
        }
    }

    /// Whether the failure was caused by a timeout.
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            timeout: err.is_timeout(),
            source: Some(Box::new(err)),
        }
    }
}

/// Trait for executing HTTP requests.
///
/// Implementations perform a single attempt and never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes the request and returns the full response.
    ///
    /// Non-2xx statuses are *not* errors at this level; only failures that
    /// prevent a response from being received are.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Connection settings for the default reqwest-backed transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    /// Total request timeout; zero disables it
    pub timeout: Duration,
    /// TCP keep-alive interval
    pub keep_alive: Duration,
    /// Maximum idle connections kept per host
    pub max_idle_conns: usize,
    /// How long an idle connection is kept in the pool
    pub idle_conn_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(30),
            max_idle_conns: 100,
            idle_conn_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpOptions {
    /// Builds a reqwest client from these options.
    pub fn build_client(&self) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .tcp_keepalive(self.keep_alive)
            .pool_max_idle_per_host(self.max_idle_conns)
            .pool_idle_timeout(self.idle_conn_timeout);
        if !self.timeout.is_zero() {
            builder = builder.timeout(self.timeout);
        }
        builder.build()
    }
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing reqwest client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport from connection options.
    pub fn from_options(options: &HttpOptions) -> Result<Self, reqwest::Error> {
        Ok(Self::new(options.build_client()?))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_response_helpers() {
        let response = HttpResponse::new(429)
            .with_header("Retry-After", "5")
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"errText":"too many"}"#);

        assert_eq!(response.header("retry-after"), Some("5"));
        assert_eq!(response.content_type(), Some("application/json"));
        assert!(!response.is_success());
        assert!(HttpResponse::new(204).is_success());
    }

    #[test]
    fn test_default_options() {
        let options = HttpOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_idle_conns, 100);
        assert!(options.build_client().is_ok());
    }

    #[tokio::test]
    async fn test_reqwest_transport_returns_non_2xx_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("X-Token", "secret"))
            .and(body_string(r#"{"amount":100}"#))
            .respond_with(
                ResponseTemplate::new(400)
                    .insert_header("Content-Type", "application/json")
                    .set_body_raw(r#"{"errCode":"BAD_REQUEST"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("X-Token", "secret".parse().unwrap());
        let transport = ReqwestTransport::from_options(&HttpOptions::default()).unwrap();
        let response = transport
            .execute(HttpRequest {
                method: Method::POST,
                url: format!("{}/echo", server.uri()),
                headers,
                body: Some(br#"{"amount":100}"#.to_vec()),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body, br#"{"errCode":"BAD_REQUEST"}"#.to_vec());
    }

    #[tokio::test]
    async fn test_reqwest_transport_timeout_is_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let options = HttpOptions {
            timeout: Duration::from_millis(100),
            ..HttpOptions::default()
        };
        let transport = ReqwestTransport::from_options(&options).unwrap();
        let err = transport
            .execute(HttpRequest {
                method: Method::GET,
                url: format!("{}/slow", server.uri()),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
    }
}
