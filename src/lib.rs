//! # monobank-acquiring
//!
//! A typed Rust client for the monobank acquiring API.
//!
//! The crate covers the merchant side of card tokenization and recurring
//! charges, and the verification of the webhooks monobank sends back.
//!
//! ## Features
//!
//! - **Card verification**: create a tokenizing invoice and get its payment page
//! - **Payments by card token**: charge a saved card, merchant or client initiated
//! - **Invoice status**: query an invoice and turn failures into [`PaymentError`]s
//! - **Webhook verification**: ECDSA P-256 / SHA-256 check of the `X-Sign` header,
//!   with the verification key resolved once and cached
//! - **Classified errors**: every non-2xx response becomes an [`ApiError`] with a
//!   status-derived [`ErrorKind`] and, for 429, the `Retry-After` delay
//! - **Dry run**: build and inspect a request without sending it
//!
//! ## Quick Start
//!
//! ### Checking an invoice
//!
//! ```rust,no_run
//! use monobank_acquiring::{ClientConfig, MonobankClient, Request};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MonobankClient::new(ClientConfig::new().with_token("merchant-token"))?;
//!
//! let status = client
//!     .status(&Request::new().with_invoice_id("p2_9ZgpZVsl3"))
//!     .await?;
//! status.require_no_payment_error()?;
//! println!("invoice {} is {}", status.invoice_id, status.status);
//! # Ok(())
//! # }
//! ```
//!
//! ### Verifying a webhook
//!
//! ```rust,no_run
//! use monobank_acquiring::{ClientConfig, ErrorKind, MonobankClient};
//!
//! # async fn example(body: &[u8], x_sign: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let client = MonobankClient::new(ClientConfig::new().with_token("merchant-token"))?;
//!
//! match client.parse_and_verify_webhook(body, x_sign).await {
//!     Ok(event) => println!("{} -> {}", event.invoice_id, event.status),
//!     Err(err) if err.kind() == ErrorKind::InvalidSignature => println!("forged webhook"),
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retries
//!
//! The client performs exactly one HTTP attempt per call. Use
//! [`MonobankError::is_retryable`] and [`MonobankError::retry_after`] to drive
//! a retry policy of your own.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod classify;
pub mod client;
pub mod errors;
pub mod logger;
pub mod payment_errors;
pub mod request;
pub mod transport;
pub mod types;
pub mod utils;
pub mod webhook;

// Re-export commonly used items
pub use client::{ClientConfig, MonobankClient, RunOptions};
pub use errors::{ApiError, ErrorKind, MonobankError, Result};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use payment_errors::{lookup_payment_error_metas, Contact, PaymentError, PaymentErrorMeta};
pub use request::Request;
pub use transport::{HttpOptions, HttpTransport};
pub use types::{
    InitiationKind, InvoiceCreateResponse, InvoiceStatus, InvoiceStatusResponse, PaymentType,
    PublicKeyResponse, WalletPaymentResponse, DEFAULT_BASE_URL, HEADER_SIGN,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        assert_eq!(DEFAULT_BASE_URL, "https://api.monobank.ua");
        assert_eq!(ClientConfig::default().base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_module_accessibility() {
        let _ = MonobankClient::new(ClientConfig::new().with_logger(std::sync::Arc::new(NoopLogger)));
        let _ = Request::new().with_amount(100);
        let _ = RunOptions::dry_run();
        assert!(lookup_payment_error_metas("6").is_some());
    }
}
