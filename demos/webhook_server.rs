//! Example webhook receiver using Axum.
//!
//! Verifies the `X-Sign` header of incoming monobank webhooks and reports
//! the invoice state, including catalog hints for failed payments.
//!
//! Run with:
//! ```bash
//! cargo run --example webhook_server
//! ```
//!
//! Environment variables (a `.env` file is honored):
//! - MONO_TOKEN: merchant token, used to fetch the webhook key
//! - MONO_WEBHOOK_PUBKEY: base64 webhook key, skips the fetch when set
//! - PORT: Server port (default: 3000)

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use monobank_acquiring::{ClientConfig, ErrorKind, MonobankClient, MonobankError, HEADER_SIGN};
use serde_json::json;
use std::sync::Arc;

struct AppState {
    client: MonobankClient,
}

/// Receives invoice status webhooks.
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let x_sign = headers
        .get(HEADER_SIGN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let event = state.client.parse_and_verify_webhook(&body, x_sign).await?;

    if let Some(payment_error) = event.payment_error() {
        tracing::warn!(
            invoice_id = %event.invoice_id,
            contacts = ?payment_error.contacts(),
            hints = ?payment_error.handling_hints(),
            "payment failed: {}",
            payment_error
        );
    } else {
        tracing::info!(invoice_id = %event.invoice_id, status = %event.status, "webhook accepted");
    }

    Ok(Json(json!({ "invoiceId": event.invoice_id, "status": event.status })).into_response())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let token = std::env::var("MONO_TOKEN").unwrap_or_default();
    let pubkey = std::env::var("MONO_WEBHOOK_PUBKEY").unwrap_or_default();
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;

    let config = ClientConfig::new()
        .with_token(token)
        .with_webhook_public_key_base64(pubkey);
    let client = MonobankClient::new(config)?;

    // Resolve the key up front so a bad configuration fails at startup
    client.webhook_public_key().await?;

    let state = Arc::new(AppState { client });
    let app = Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("webhook receiver listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

struct AppError(MonobankError);

impl From<MonobankError> for AppError {
    fn from(err: MonobankError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::InvalidSignature | ErrorKind::Validation => StatusCode::UNAUTHORIZED,
            ErrorKind::Decode => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = %status, "webhook rejected: {}", self.0);

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
