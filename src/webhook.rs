//! Webhook signature verification.
//!
//! monobank signs every webhook body with ECDSA P-256 over SHA-256 and sends
//! the base64 ASN.1 DER signature in the `X-Sign` header. The verification
//! key is resolved once per client, from the first usable [`KeySource`], and
//! cached in a [`KeyCell`].
//!
//! # Example
//!
//! ```
//! use monobank_acquiring::webhook::{decode_signature_header, verify_signature};
//! use p256::ecdsa::{signature::Signer, Signature, SigningKey};
//! use p256::PublicKey;
//!
//! let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
//! let public_key = PublicKey::from(signing_key.verifying_key());
//!
//! let body = br#"{"invoiceId":"inv-1","status":"success"}"#;
//! let signature: Signature = signing_key.sign(body);
//! let x_sign = monobank_acquiring::utils::encode_base64(signature.to_der().as_bytes());
//!
//! let der = decode_signature_header(&x_sign).unwrap();
//! assert!(verify_signature(&public_key, body, &der).is_ok());
//! assert!(verify_signature(&public_key, b"tampered", &der).is_err());
//! ```

use crate::errors::{MonobankError, Result};
use crate::types::InvoiceStatusResponse;
use crate::utils::{decode_base64, trim_body, MAX_BODY_SNIPPET};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use p256::PublicKey;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Where the webhook verification key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// PEM-encoded SPKI public key.
    Pem(Vec<u8>),
    /// Base64 of a PEM-encoded public key, as served by the pubkey endpoint.
    Base64(String),
    /// Fetch from `GET /api/merchant/pubkey` with the default token.
    Remote,
}

impl KeySource {
    /// Picks the source by fixed priority: raw PEM, then base64, then remote.
    ///
    /// Blank values do not count as configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use monobank_acquiring::webhook::KeySource;
    ///
    /// assert_eq!(
    ///     KeySource::select(Some(b"pem".as_slice()), Some("base64")),
    ///     KeySource::Pem(b"pem".to_vec())
    /// );
    /// assert_eq!(
    ///     KeySource::select(None, Some(" base64 ")),
    ///     KeySource::Base64("base64".to_string())
    /// );
    /// assert_eq!(KeySource::select(Some(b"".as_slice()), Some("  ")), KeySource::Remote);
    /// ```
    pub fn select(pem: Option<&[u8]>, base64: Option<&str>) -> Self {
        if let Some(pem) = pem.filter(|pem| !pem.is_empty()) {
            return KeySource::Pem(pem.to_vec());
        }
        match base64.map(str::trim).filter(|b64| !b64.is_empty()) {
            Some(b64) => KeySource::Base64(b64.to_string()),
            None => KeySource::Remote,
        }
    }
}

/// A freshly resolved key, plus the base64 text it came from, if any.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    /// Parsed P-256 public key.
    pub key: PublicKey,
    /// Base64 PEM text the key was decoded from.
    pub base64: Option<String>,
}

impl ResolvedKey {
    /// Wraps a key without base64 text.
    pub fn new(key: PublicKey) -> Self {
        Self { key, base64: None }
    }

    /// Wraps a key decoded from base64 text.
    pub fn with_base64(key: PublicKey, base64: impl Into<String>) -> Self {
        Self {
            key,
            base64: Some(base64.into()),
        }
    }
}

#[derive(Debug, Default)]
struct KeyState {
    key: Option<Arc<PublicKey>>,
    base64: Option<String>,
}

/// Lazily populated, never refreshed verification key.
///
/// Resolution is serialized by a separate lock held across check, resolve
/// and store, so concurrent callers wait for the in-flight resolution instead
/// of starting their own. Reads of the cached values never wait on it.
/// Nothing is stored unless resolution succeeds; a cancelled resolution
/// releases the lock and leaves the cell empty.
#[derive(Debug, Default)]
pub struct KeyCell {
    state: RwLock<KeyState>,
    resolving: Mutex<()>,
}

impl KeyCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached key without resolving.
    pub async fn get(&self) -> Option<Arc<PublicKey>> {
        self.state.read().await.key.clone()
    }

    /// Base64 text of the cached key, when it was resolved from base64.
    pub async fn cached_base64(&self) -> Option<String> {
        self.state.read().await.base64.clone()
    }

    /// Returns the cached key, running `resolve` first if the cell is empty.
    pub async fn get_or_resolve<F, Fut>(&self, resolve: F) -> Result<Arc<PublicKey>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResolvedKey>>,
    {
        if let Some(key) = self.get().await {
            return Ok(key);
        }

        let _resolving = self.resolving.lock().await;
        // another caller may have finished while we waited
        if let Some(key) = self.get().await {
            return Ok(key);
        }

        let resolved = resolve().await?;
        let key = Arc::new(resolved.key);
        let mut state = self.state.write().await;
        state.key = Some(Arc::clone(&key));
        if resolved.base64.is_some() {
            state.base64 = resolved.base64;
        }
        Ok(key)
    }
}

/// Parses a PEM-encoded SPKI public key and requires it to be EC P-256.
pub fn parse_public_key_pem(pem: &[u8]) -> Result<PublicKey> {
    let text = std::str::from_utf8(pem).map_err(|e| {
        MonobankError::decode("pubkey", "pem is not valid utf-8", Vec::new(), Some(Box::new(e)))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(MonobankError::decode("pubkey", "empty pem", Vec::new(), None));
    }

    PublicKey::from_public_key_pem(text).map_err(|e| {
        MonobankError::decode(
            "pubkey",
            format!("parse P-256 public key: {}", e),
            Vec::new(),
            Some(Box::new(e)),
        )
    })
}

/// Decodes base64 PEM text and parses the key inside.
pub fn parse_public_key_base64(encoded: &str) -> Result<PublicKey> {
    let pem = decode_base64("pubkey", encoded)?;
    parse_public_key_pem(&pem)
}

/// Decodes the `X-Sign` header into DER signature bytes.
pub fn decode_signature_header(x_sign: &str) -> Result<Vec<u8>> {
    decode_base64("verify", x_sign)
}

/// Verifies a DER-encoded ECDSA signature over the SHA-256 of `body`.
///
/// `body` must be the exact bytes received. A signature that is not valid
/// DER is reported the same way as one that does not verify.
pub fn verify_signature(key: &PublicKey, body: &[u8], signature_der: &[u8]) -> Result<()> {
    let signature = Signature::from_der(signature_der)
        .map_err(|_| MonobankError::invalid_signature("verify", "invalid signature"))?;

    let digest = Sha256::digest(body);
    VerifyingKey::from(key)
        .verify_prehash(&digest, &signature)
        .map_err(|_| MonobankError::invalid_signature("verify", "invalid signature"))
}

/// Decodes a webhook body into an invoice status event.
pub fn parse_webhook_body(body: &[u8]) -> Result<InvoiceStatusResponse> {
    if body.is_empty() {
        return Err(MonobankError::validation("webhook", "body is empty"));
    }
    serde_json::from_slice(body).map_err(|e| {
        MonobankError::decode(
            "webhook",
            "json unmarshal",
            trim_body(body, MAX_BODY_SNIPPET),
            Some(Box::new(e)),
        )
    })
}
