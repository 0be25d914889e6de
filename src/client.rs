//! Client for the monobank acquiring API.
//!
//! [`MonobankClient`] performs the merchant API calls (card verification,
//! payment by card token, invoice status, public key) and verifies inbound
//! webhooks. Every call is a single attempt; failures are returned to the
//! caller with enough metadata ([`MonobankError::kind`],
//! [`MonobankError::retry_after`]) to decide whether to retry.

use crate::classify::classify_response;
use crate::errors::{BoxError, MonobankError, Result};
use crate::logger::{Logger, TracingLogger};
use crate::request::Request;
use crate::transport::{HttpOptions, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{
    InitiationKind, InvoiceCreateResponse, InvoiceStatusResponse, PublicKeyResponse,
    WalletPaymentResponse, CURRENCY_UAH, DEFAULT_BASE_URL, HEADER_CMS, HEADER_CMS_VERSION,
    HEADER_TOKEN, PATH_INVOICE_CREATE, PATH_INVOICE_STATUS, PATH_PUBKEY, PATH_WALLET_PAYMENT,
};
use crate::utils::{non_blank, trim_body, MAX_BODY_SNIPPET};
use crate::webhook::{
    decode_signature_header, parse_public_key_base64, parse_public_key_pem, parse_webhook_body,
    verify_signature, KeyCell, KeySource, ResolvedKey,
};
use p256::PublicKey;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const TOKEN_REQUIRED: &str =
    "X-Token is required (set Request::with_token or ClientConfig::with_token)";

/// Configuration for [`MonobankClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL without a trailing slash
    pub base_url: String,

    /// Default `X-Token`, used when a request carries none
    pub token: Option<String>,

    /// Connection settings for the default transport
    pub http: HttpOptions,

    /// Pre-built reqwest client for the default transport
    pub http_client: Option<Client>,

    /// Custom transport; takes precedence over `http` and `http_client`
    pub transport: Option<Arc<dyn HttpTransport>>,

    /// Webhook verification key as PEM
    pub webhook_public_key_pem: Option<Vec<u8>>,

    /// Webhook verification key as base64 PEM (the pubkey endpoint format)
    pub webhook_public_key_base64: Option<String>,

    /// Diagnostics sink
    pub logger: Arc<dyn Logger>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            http: HttpOptions::default(),
            http_client: None,
            transport: None,
            webhook_public_key_pem: None,
            webhook_public_key_base64: None,
            logger: Arc::new(TracingLogger),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("http", &self.http)
            .field("http_client", &self.http_client.is_some())
            .field("transport", &self.transport.is_some())
            .field("webhook_public_key_pem", &self.webhook_public_key_pem.is_some())
            .field(
                "webhook_public_key_base64",
                &self.webhook_public_key_base64.is_some(),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration with the production base URL and defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use monobank_acquiring::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new()
    ///     .with_token("merchant-token")
    ///     .with_base_url("https://api.monobank.ua/")
    ///     .with_timeout(Duration::from_secs(10));
    ///
    /// assert_eq!(config.base_url, "https://api.monobank.ua");
    /// assert_eq!(config.token.as_deref(), Some("merchant-token"));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API base URL. Blank values are ignored.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        let base_url = base_url.as_ref().trim().trim_end_matches('/');
        if !base_url.is_empty() {
            self.base_url = base_url.to_string();
        }
        self
    }

    /// Sets the default `X-Token`.
    pub fn with_token(mut self, token: impl AsRef<str>) -> Self {
        self.token = non_blank(token);
        self
    }

    /// Sets the total per-request timeout; zero disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Sets the TCP keep-alive interval.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.http.keep_alive = keep_alive;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_conns(mut self, max_idle_conns: usize) -> Self {
        self.http.max_idle_conns = max_idle_conns;
        self
    }

    /// Sets how long idle connections stay pooled.
    pub fn with_idle_conn_timeout(mut self, idle_conn_timeout: Duration) -> Self {
        self.http.idle_conn_timeout = idle_conn_timeout;
        self
    }

    /// Uses a pre-built reqwest client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Uses a custom transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the webhook verification key as PEM. Empty input is ignored.
    pub fn with_webhook_public_key_pem(mut self, pem: impl AsRef<[u8]>) -> Self {
        let pem = pem.as_ref();
        if !pem.is_empty() {
            self.webhook_public_key_pem = Some(pem.to_vec());
        }
        self
    }

    /// Sets the webhook verification key as base64 PEM.
    pub fn with_webhook_public_key_base64(mut self, key: impl AsRef<str>) -> Self {
        self.webhook_public_key_base64 = non_blank(key);
        self
    }

    /// Sets the diagnostics sink.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}

/// Receives the endpoint and JSON payload of a skipped request.
pub type DryRunHandler = Arc<dyn Fn(&str, Option<&Value>) + Send + Sync>;

/// Per-call behavior.
#[derive(Clone, Default)]
pub struct RunOptions {
    dry_run: bool,
    handler: Option<DryRunHandler>,
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("dry_run", &self.dry_run)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl RunOptions {
    /// Skips the HTTP call and logs the request through the client logger.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            handler: None,
        }
    }

    /// Skips the HTTP call and hands the request to `handler`.
    ///
    /// # Examples
    ///
    /// ```
    /// use monobank_acquiring::client::RunOptions;
    ///
    /// let options = RunOptions::dry_run_with(|endpoint, payload| {
    ///     println!("{} {:?}", endpoint, payload);
    /// });
    /// assert!(options.is_dry_run());
    /// ```
    pub fn dry_run_with<F>(handler: F) -> Self
    where
        F: Fn(&str, Option<&Value>) + Send + Sync + 'static,
    {
        Self {
            dry_run: true,
            handler: Some(Arc::new(handler)),
        }
    }

    /// Whether the HTTP call is skipped.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A prepared API call.
struct ApiCall {
    op: &'static str,
    method: Method,
    path: String,
    token: String,
    cms: Option<String>,
    cms_version: Option<String>,
    payload: Option<Value>,
    /// Shown on dry run instead of the body, for calls that carry none.
    query_payload: Option<Value>,
}

impl ApiCall {
    fn new(op: &'static str, method: Method, path: impl Into<String>, token: String) -> Self {
        Self {
            op,
            method,
            path: path.into(),
            token,
            cms: None,
            cms_version: None,
            payload: None,
            query_payload: None,
        }
    }

    fn with_request_headers(mut self, request: &Request) -> Self {
        self.cms = request.cms().map(str::to_string);
        self.cms_version = request.cms_version().map(str::to_string);
        self
    }

    fn with_payload<P: Serialize>(mut self, payload: &P) -> Result<Self> {
        let value = serde_json::to_value(payload)
            .map_err(|source| MonobankError::Encode { op: self.op, source })?;
        self.payload = Some(value);
        Ok(self)
    }

    fn dry_run_payload(&self) -> Option<&Value> {
        self.payload.as_ref().or(self.query_payload.as_ref())
    }
}

/// monobank acquiring API client.
///
/// Cheap to share behind an `Arc`; the cached webhook key lives inside.
pub struct MonobankClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    logger: Arc<dyn Logger>,
    webhook_key: KeyCell,
}

impl fmt::Debug for MonobankClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonobankClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MonobankClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// [`MonobankError::Configuration`] when the default HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport: Arc<dyn HttpTransport> = match (&config.transport, &config.http_client) {
            (Some(transport), _) => Arc::clone(transport),
            (None, Some(client)) => Arc::new(ReqwestTransport::new(client.clone())),
            (None, None) => Arc::new(
                ReqwestTransport::from_options(&config.http).map_err(|e| {
                    MonobankError::Configuration(format!("build http client: {}", e))
                })?,
            ),
        };
        let logger = Arc::clone(&config.logger);

        Ok(Self {
            config,
            transport,
            logger,
            webhook_key: KeyCell::new(),
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Creates an invoice that tokenizes the customer's card.
    ///
    /// `POST /api/merchant/invoice/create`.
    pub async fn verification(&self, request: &Request) -> Result<InvoiceCreateResponse> {
        let call = self.prepare_verification(request)?;
        self.execute(&call).await
    }

    /// [`verification`](Self::verification) with run options; `Ok(None)` on dry run.
    pub async fn verification_with_options(
        &self,
        request: &Request,
        options: &RunOptions,
    ) -> Result<Option<InvoiceCreateResponse>> {
        let call = self.prepare_verification(request)?;
        self.execute_with_options(&call, options).await
    }

    /// Creates a verification invoice and returns its payment page.
    pub async fn verification_link(&self, request: &Request) -> Result<Url> {
        let response = self.verification(request).await?;
        page_url(&response)
    }

    /// [`verification_link`](Self::verification_link) with run options; `Ok(None)` on dry run.
    pub async fn verification_link_with_options(
        &self,
        request: &Request,
        options: &RunOptions,
    ) -> Result<Option<Url>> {
        match self.verification_with_options(request, options).await? {
            Some(response) => page_url(&response).map(Some),
            None => Ok(None),
        }
    }

    /// Charges a tokenized card.
    ///
    /// `POST /api/merchant/wallet/payment`.
    pub async fn payment(&self, request: &Request) -> Result<WalletPaymentResponse> {
        let call = self.prepare_payment(request)?;
        self.execute(&call).await
    }

    /// [`payment`](Self::payment) with run options; `Ok(None)` on dry run.
    pub async fn payment_with_options(
        &self,
        request: &Request,
        options: &RunOptions,
    ) -> Result<Option<WalletPaymentResponse>> {
        let call = self.prepare_payment(request)?;
        self.execute_with_options(&call, options).await
    }

    /// Fetches the invoice status.
    ///
    /// `GET /api/merchant/invoice/status?invoiceId=...`.
    pub async fn status(&self, request: &Request) -> Result<InvoiceStatusResponse> {
        let call = self.prepare_status(request)?;
        self.execute(&call).await
    }

    /// [`status`](Self::status) with run options; `Ok(None)` on dry run.
    pub async fn status_with_options(
        &self,
        request: &Request,
        options: &RunOptions,
    ) -> Result<Option<InvoiceStatusResponse>> {
        let call = self.prepare_status(request)?;
        self.execute_with_options(&call, options).await
    }

    /// Fetches the webhook verification key (base64 PEM).
    ///
    /// `GET /api/merchant/pubkey`. Does not touch the cached webhook key.
    pub async fn public_key(&self, request: &Request) -> Result<PublicKeyResponse> {
        let call = self.prepare_public_key(request)?;
        self.execute(&call).await
    }

    /// [`public_key`](Self::public_key) with run options; `Ok(None)` on dry run.
    pub async fn public_key_with_options(
        &self,
        request: &Request,
        options: &RunOptions,
    ) -> Result<Option<PublicKeyResponse>> {
        let call = self.prepare_public_key(request)?;
        self.execute_with_options(&call, options).await
    }

    /// Verifies the `X-Sign` signature of a webhook body.
    ///
    /// `body` must be the raw request body exactly as received.
    ///
    /// # Errors
    ///
    /// - [`MonobankError::Validation`] for an empty body or header
    /// - [`MonobankError::Decode`] when `x_sign` is not base64
    /// - [`MonobankError::InvalidSignature`] when the signature does not verify
    /// - any key resolution error, see [`webhook_public_key`](Self::webhook_public_key)
    pub async fn verify_webhook(&self, body: &[u8], x_sign: &str) -> Result<()> {
        self.logger
            .debug(&format!("Webhook verify: body_size={}", body.len()));
        if body.is_empty() {
            self.logger.error("Webhook verify: body is empty");
            return Err(MonobankError::validation("verify", "body is empty"));
        }
        let x_sign = x_sign.trim();
        if x_sign.is_empty() {
            self.logger.error("Webhook verify: X-Sign header is empty");
            return Err(MonobankError::validation("verify", "X-Sign header is empty"));
        }

        let key = self.webhook_public_key().await.map_err(|err| {
            self.logger
                .error(&format!("Webhook verify: cannot resolve public key: {}", err));
            err
        })?;

        let signature = decode_signature_header(x_sign).map_err(|err| {
            self.logger
                .error(&format!("Webhook verify: X-Sign decode error: {}", err));
            err
        })?;

        verify_signature(&key, body, &signature).map_err(|err| {
            self.logger.warn("Webhook verify: invalid signature");
            err
        })?;

        self.logger.info("Webhook verify: signature is valid");
        Ok(())
    }

    /// Decodes a webhook body without checking its signature.
    pub fn parse_webhook(&self, body: &[u8]) -> Result<InvoiceStatusResponse> {
        self.logger
            .debug(&format!("Webhook parse: body_size={}", body.len()));
        match parse_webhook_body(body) {
            Ok(event) => {
                self.logger.info(&format!(
                    "Webhook parse: status={} invoice_id={}",
                    event.status, event.invoice_id
                ));
                Ok(event)
            }
            Err(err) => {
                self.logger.error(&format!("Webhook parse: {}", err));
                Err(err)
            }
        }
    }

    /// Verifies the signature, then decodes the body.
    ///
    /// The body is not decoded unless the signature verifies.
    pub async fn parse_and_verify_webhook(
        &self,
        body: &[u8],
        x_sign: &str,
    ) -> Result<InvoiceStatusResponse> {
        self.verify_webhook(body, x_sign).await?;
        self.parse_webhook(body)
    }

    /// Verifies the signature, then decodes the body with `parse`.
    pub async fn parse_and_verify_webhook_with<T, F>(
        &self,
        body: &[u8],
        x_sign: &str,
        parse: F,
    ) -> Result<T>
    where
        F: FnOnce(&[u8]) -> Result<T>,
    {
        self.verify_webhook(body, x_sign).await?;
        parse(body)
    }

    /// Resolves the webhook verification key, caching it for the client lifetime.
    ///
    /// Sources, in order: configured PEM, configured base64 PEM, then
    /// `GET /api/merchant/pubkey` with the default token.
    ///
    /// # Errors
    ///
    /// - [`MonobankError::Configuration`] when no key is configured and there is no default token
    /// - [`MonobankError::Decode`] for malformed or non-P-256 key material
    /// - any classified error of the remote fetch
    pub async fn webhook_public_key(&self) -> Result<Arc<PublicKey>> {
        self.webhook_key
            .get_or_resolve(|| self.resolve_webhook_key())
            .await
    }

    /// Base64 text of the cached webhook key, once resolved from base64 or fetched.
    pub async fn cached_public_key_base64(&self) -> Option<String> {
        self.webhook_key.cached_base64().await
    }

    async fn resolve_webhook_key(&self) -> Result<ResolvedKey> {
        let source = KeySource::select(
            self.config.webhook_public_key_pem.as_deref(),
            self.config.webhook_public_key_base64.as_deref(),
        );
        match source {
            KeySource::Pem(pem) => {
                self.logger.debug("Webhook key: using configured PEM");
                parse_public_key_pem(&pem).map(ResolvedKey::new)
            }
            KeySource::Base64(encoded) => {
                self.logger.debug("Webhook key: using configured base64 PEM");
                let key = parse_public_key_base64(&encoded)?;
                Ok(ResolvedKey::with_base64(key, encoded))
            }
            KeySource::Remote => self.fetch_webhook_key().await,
        }
    }

    async fn fetch_webhook_key(&self) -> Result<ResolvedKey> {
        let token = self.config.token.clone().ok_or_else(|| {
            MonobankError::Configuration(
                "webhook public key is not configured and the default token is empty; \
                 set ClientConfig::with_webhook_public_key_base64 or ClientConfig::with_token"
                    .to_string(),
            )
        })?;

        self.logger.debug("Webhook key: fetching from API");
        let call = ApiCall::new("pubkey", Method::GET, PATH_PUBKEY, token);
        let response: PublicKeyResponse = self.execute(&call).await?;

        let encoded = response.key.trim();
        if encoded.is_empty() {
            return Err(MonobankError::decode(
                "pubkey",
                "empty key in response",
                Vec::new(),
                None,
            ));
        }
        let key = parse_public_key_base64(encoded)?;
        Ok(ResolvedKey::with_base64(key, encoded))
    }

    fn resolve_token(&self, op: &'static str, request: &Request) -> Result<String> {
        request
            .token()
            .or(self.config.token.as_deref())
            .map(str::to_string)
            .ok_or_else(|| {
                self.logger.error(&format!("{}: token is empty", op));
                MonobankError::validation(op, TOKEN_REQUIRED)
            })
    }

    fn prepare_verification(&self, request: &Request) -> Result<ApiCall> {
        const OP: &str = "verification";
        let token = self.resolve_token(OP, request)?;

        let amount = request.amount();
        if amount <= 0 {
            return Err(MonobankError::validation(OP, "amount (minor units) must be > 0"));
        }
        let ccy = request.currency().filter(|ccy| *ccy != 0).unwrap_or(CURRENCY_UAH);
        if request.should_save_card() && request.wallet_id().is_none() {
            return Err(MonobankError::validation(
                OP,
                "walletId is required when save card is enabled",
            ));
        }

        ApiCall::new(OP, Method::POST, PATH_INVOICE_CREATE, token)
            .with_request_headers(request)
            .with_payload(&request.invoice_create_payload(amount, ccy))
    }

    fn prepare_payment(&self, request: &Request) -> Result<ApiCall> {
        const OP: &str = "payment";
        let token = self.resolve_token(OP, request)?;

        let card_token = request
            .card_token()
            .ok_or_else(|| MonobankError::validation(OP, "cardToken is required"))?;
        let amount = request.amount();
        if amount <= 0 {
            return Err(MonobankError::validation(OP, "amount (minor units) must be > 0"));
        }
        let ccy = request.currency().filter(|ccy| *ccy != 0).unwrap_or(CURRENCY_UAH);
        let initiation_kind = request.initiation_kind().ok_or_else(|| {
            MonobankError::validation(OP, "initiationKind is required (merchant|client)")
        })?;
        if initiation_kind == InitiationKind::Client && request.redirect_url().is_none() {
            return Err(MonobankError::validation(
                OP,
                "redirectUrl is required when initiationKind=client",
            ));
        }

        let payload = request.wallet_payment_payload(card_token, amount, ccy, initiation_kind);
        ApiCall::new(OP, Method::POST, PATH_WALLET_PAYMENT, token)
            .with_request_headers(request)
            .with_payload(&payload)
    }

    fn prepare_status(&self, request: &Request) -> Result<ApiCall> {
        const OP: &str = "status";
        let token = self.resolve_token(OP, request)?;
        let invoice_id = request
            .invoice_id()
            .ok_or_else(|| MonobankError::validation(OP, "invoiceId is required"))?;

        let escaped: String = url::form_urlencoded::byte_serialize(invoice_id.as_bytes()).collect();
        let mut call = ApiCall::new(
            OP,
            Method::GET,
            format!("{}?invoiceId={}", PATH_INVOICE_STATUS, escaped),
            token,
        )
        .with_request_headers(request);
        call.query_payload = Some(serde_json::json!({ "invoiceId": invoice_id }));
        Ok(call)
    }

    fn prepare_public_key(&self, request: &Request) -> Result<ApiCall> {
        let token = self.resolve_token("pubkey", request)?;
        Ok(ApiCall::new("pubkey", Method::GET, PATH_PUBKEY, token).with_request_headers(request))
    }

    async fn execute_with_options<T: DeserializeOwned>(
        &self,
        call: &ApiCall,
        options: &RunOptions,
    ) -> Result<Option<T>> {
        if options.is_dry_run() {
            let endpoint = self.endpoint(call);
            match &options.handler {
                Some(handler) => handler(&endpoint, call.dry_run_payload()),
                None => self.log_dry_run(&endpoint, call.dry_run_payload()),
            }
            return Ok(None);
        }
        self.execute(call).await.map(Some)
    }

    fn log_dry_run(&self, endpoint: &str, payload: Option<&Value>) {
        self.logger
            .info(&format!("Dry run: skipping request to {}", endpoint));
        match payload.map(serde_json::to_string_pretty) {
            None => self.logger.info("Dry run payload: <none>"),
            Some(Ok(pretty)) => self.logger.info(&format!("Dry run payload:\n{}", pretty)),
            Some(Err(e)) => self
                .logger
                .info(&format!("Dry run payload: unable to render: {}", e)),
        }
    }

    fn endpoint(&self, call: &ApiCall) -> String {
        format!("{}{}", self.config.base_url, call.path)
    }

    /// Sends the call and classifies the response, logging by severity.
    async fn execute<T: DeserializeOwned>(&self, call: &ApiCall) -> Result<T> {
        let response = self.send(call).await?;
        let result = classify_response(&call.method, &call.path, &response);

        match &result {
            Ok(_) => self.logger.debug(&format!(
                "HTTP response: decoded into {}",
                std::any::type_name::<T>()
            )),
            Err(MonobankError::Api(api)) => {
                let message = format!(
                    "HTTP response: non-2xx method={} path={} status={} err_code={} description={}",
                    call.method, call.path, api.status_code, api.err_code, api.description
                );
                if api.status_code >= 500 {
                    self.logger.error(&message);
                } else {
                    self.logger.warn(&message);
                }
                if let Some(retry_after) = api.retry_after {
                    self.logger.warn(&format!(
                        "HTTP response: retry_after={}s for method={} path={}",
                        retry_after.as_secs(),
                        call.method,
                        call.path
                    ));
                }
            }
            Err(err) => self.logger.error(&format!(
                "HTTP response: method={} path={}: {}",
                call.method, call.path, err
            )),
        }

        result
    }

    async fn send(&self, call: &ApiCall) -> Result<HttpResponse> {
        let url = self.endpoint(call);
        self.logger.info(&format!(
            "HTTP request: method={} path={}",
            call.method, call.path
        ));
        self.logger.debug(&format!("HTTP request: endpoint={}", url));

        let request = self.build_request(call, url.clone())?;
        if let Some(body) = &request.body {
            self.logger.debug(&format!(
                "HTTP request: payload={}",
                String::from_utf8_lossy(&trim_body(body, MAX_BODY_SNIPPET))
            ));
        }

        let timeout = self.config.http.timeout;
        let outcome = if timeout.is_zero() {
            self.transport.execute(request).await
        } else {
            match tokio::time::timeout(timeout, self.transport.execute(request)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.logger.error(&format!(
                        "HTTP request: timeout method={} path={}",
                        call.method, call.path
                    ));
                    return Err(MonobankError::Timeout {
                        method: call.method.to_string(),
                        url,
                    });
                }
            }
        };

        let response = outcome.map_err(|source| {
            self.logger.error(&format!(
                "HTTP request: transport error method={} path={} err={}",
                call.method, call.path, source
            ));
            if source.is_timeout() {
                MonobankError::Timeout {
                    method: call.method.to_string(),
                    url: url.clone(),
                }
            } else {
                MonobankError::Transport {
                    op: "http.do",
                    method: call.method.to_string(),
                    url: url.clone(),
                    source,
                }
            }
        })?;

        self.logger.info(&format!(
            "HTTP response: method={} path={} status={}",
            call.method, call.path, response.status
        ));
        self.logger.debug(&format!(
            "HTTP response: method={} path={} body={}",
            call.method,
            call.path,
            String::from_utf8_lossy(&trim_body(&response.body, MAX_BODY_SNIPPET))
        ));
        Ok(response)
    }

    fn build_request(&self, call: &ApiCall, url: String) -> Result<HttpRequest> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        insert_header(&mut headers, call.op, HEADER_TOKEN, &call.token)?;
        if let Some(cms) = &call.cms {
            insert_header(&mut headers, call.op, HEADER_CMS, cms)?;
        }
        if let Some(cms_version) = &call.cms_version {
            insert_header(&mut headers, call.op, HEADER_CMS_VERSION, cms_version)?;
        }

        let body = match &call.payload {
            Some(payload) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(
                    serde_json::to_vec(payload)
                        .map_err(|source| MonobankError::Encode { op: call.op, source })?,
                )
            }
            None => None,
        };

        Ok(HttpRequest {
            method: call.method.clone(),
            url,
            headers,
            body,
        })
    }
}

fn insert_header(headers: &mut HeaderMap, op: &'static str, name: &str, value: &str) -> Result<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| MonobankError::validation(op, format!("invalid header name {}", name)))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| {
        MonobankError::validation(op, format!("{} contains characters not allowed in headers", name))
    })?;
    headers.insert(header_name, header_value);
    Ok(())
}

fn page_url(response: &InvoiceCreateResponse) -> Result<Url> {
    response.parsed_page_url().map_err(|e| {
        MonobankError::decode(
            "verification",
            format!("cannot parse pageUrl {:?}: {}", response.page_url, e),
            trim_body(response.page_url.as_bytes(), MAX_BODY_SNIPPET),
            Some(Box::new(e) as BoxError),
        )
    })
}
