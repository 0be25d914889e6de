//! Integration tests for the monobank-acquiring library.
//!
//! These tests drive the public client against a local mock of the
//! acquiring API, covering webhook verification end to end, response
//! classification and dry runs.

use base64::{engine::general_purpose::STANDARD, Engine};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use monobank_acquiring::{
    ClientConfig, Contact, ErrorKind, InitiationKind, InvoiceStatus, MonobankClient,
    MonobankError, NoopLogger, PaymentType, Request, RunOptions,
};

const TOKEN: &str = "merchant-token";

struct Signer256 {
    key: SigningKey,
}

impl Signer256 {
    fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    fn public_key_pem(&self) -> String {
        self.key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap()
    }

    fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key_pem())
    }

    fn x_sign(&self, body: &[u8]) -> String {
        let signature: Signature = self.key.sign(body);
        STANDARD.encode(signature.to_der().as_bytes())
    }
}

fn client_for(server: &MockServer) -> MonobankClient {
    let config = ClientConfig::new()
        .with_base_url(server.uri())
        .with_token(TOKEN)
        .with_logger(Arc::new(NoopLogger));
    MonobankClient::new(config).unwrap()
}

#[tokio::test]
async fn test_webhook_with_fetched_key() {
    let server = MockServer::start().await;
    let signer = Signer256::generate();

    Mock::given(method("GET"))
        .and(path("/api/merchant/pubkey"))
        .and(header("X-Token", TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "key": signer.public_key_base64() })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = br#"{"invoiceId":"p2_9ZgpZVsl3","status":"success","amount":4200,"ccy":980,"walletData":{"cardToken":"card-1","walletId":"wallet-1","status":"created"}}"#;

    let event = client
        .parse_and_verify_webhook(body, &signer.x_sign(body))
        .await
        .unwrap();
    assert_eq!(event.invoice_id, "p2_9ZgpZVsl3");
    assert_eq!(event.status, InvoiceStatus::Success);
    assert_eq!(event.amount, 4200);
    assert!(event.payment_error().is_none());

    // the key is cached: a second webhook does not hit the pubkey endpoint
    let body = br#"{"invoiceId":"p2_other","status":"processing"}"#;
    let event = client
        .parse_and_verify_webhook(body, &signer.x_sign(body))
        .await
        .unwrap();
    assert!(event.status.is_pending());
    assert_eq!(
        client.cached_public_key_base64().await,
        Some(signer.public_key_base64())
    );
}

#[tokio::test]
async fn test_webhook_with_configured_pem() {
    let signer = Signer256::generate();
    let client = MonobankClient::new(
        ClientConfig::new()
            .with_webhook_public_key_pem(signer.public_key_pem())
            .with_logger(Arc::new(NoopLogger)),
    )
    .unwrap();

    let body = br#"{"invoiceId":"inv-1","status":"success"}"#;
    let event = client
        .parse_and_verify_webhook(body, &signer.x_sign(body))
        .await
        .unwrap();
    assert_eq!(event.invoice_id, "inv-1");
    assert_eq!(event.status.as_str(), "success");
    assert!(event.status.is_final());
}

#[tokio::test]
async fn test_forged_webhook_is_rejected() {
    let signer = Signer256::generate();
    let attacker = Signer256::generate();
    let client = MonobankClient::new(
        ClientConfig::new()
            .with_webhook_public_key_pem(signer.public_key_pem())
            .with_logger(Arc::new(NoopLogger)),
    )
    .unwrap();

    let body = br#"{"invoiceId":"inv-1","status":"success"}"#;
    let err = client
        .parse_and_verify_webhook(body, &attacker.x_sign(body))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignature);

    let mut tampered = body.to_vec();
    tampered[5] ^= 0x01;
    let err = client
        .verify_webhook(&tampered, &signer.x_sign(body))
        .await
        .unwrap_err();
    assert!(matches!(err, MonobankError::InvalidSignature { .. }));
}

#[tokio::test]
async fn test_status_failure_maps_to_payment_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/merchant/invoice/status"))
        .and(query_param("invoiceId", "inv-1"))
        .and(header("X-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "invoiceId": "inv-1",
            "status": "failure",
            "failureReason": "Transaction is blocked",
            "errCode": "6",
            "amount": 100,
            "ccy": 980
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let status = client
        .status(&Request::new().with_invoice_id("inv-1"))
        .await
        .unwrap();
    assert!(status.status.is_failure());

    let err = status.require_no_payment_error().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Payment);
    match err {
        MonobankError::Payment(payment) => {
            assert_eq!(payment.err_code, "6");
            assert_eq!(payment.failure_reason, "Transaction is blocked");
            assert_eq!(
                payment.primary_meta().map(|meta| meta.contact),
                Some(Contact::IssuingBank)
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_verification_and_payment_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/merchant/invoice/create"))
        .and(body_partial_json(json!({
            "amount": 100,
            "ccy": 980,
            "paymentType": "debit",
            "saveCardData": { "saveCard": true, "walletId": "wallet-1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "invoiceId": "inv-verify",
            "pageUrl": "https://pay.mbnk.biz/inv-verify"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/merchant/wallet/payment"))
        .and(header("X-Cms", "shop"))
        .and(body_partial_json(json!({
            "cardToken": "card-1",
            "amount": 2500,
            "initiationKind": "merchant",
            "paymentType": "hold"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "invoiceId": "inv-pay",
            "status": "processing",
            "amount": 2500,
            "ccy": 980
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let link = client
        .verification_link(&Request::new().with_amount(100).save_card("wallet-1"))
        .await
        .unwrap();
    assert_eq!(link.host_str(), Some("pay.mbnk.biz"));

    let payment = client
        .payment(
            &Request::new()
                .with_cms("shop")
                .with_card_token("card-1")
                .with_amount(2500)
                .with_payment_type(PaymentType::Hold)
                .with_initiation_kind(InitiationKind::Merchant),
        )
        .await
        .unwrap();
    assert_eq!(payment.invoice_id, "inv-pay");
    assert!(!payment.requires_3ds());
    assert!(payment.require_no_payment_error().is_ok());
}

#[tokio::test]
async fn test_rate_limited_carries_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/merchant/invoice/status"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .set_body_json(json!({ "errCode": "TMR", "errText": "too many requests" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .status(&Request::new().with_invoice_id("inv-1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));

    let api = err.api_error().unwrap();
    assert_eq!(api.status_code, 429);
    assert_eq!(api.err_code, "TMR");
    assert_eq!(api.description, "too many requests");
    assert_eq!(api.method, "GET");
    assert_eq!(api.endpoint, "/api/merchant/invoice/status?invoiceId=inv-1");
}

#[tokio::test]
async fn test_rejected_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/merchant/pubkey"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "errorDescription": "forbidden" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.public_key(&Request::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredential);
    assert!(!err.is_retryable());
    assert_eq!(err.retry_after(), None);
}

#[tokio::test]
async fn test_empty_success_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/merchant/invoice/status"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .status(&Request::new().with_invoice_id("inv-1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedResponse);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/merchant/pubkey"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "key": "abc" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new()
        .with_base_url(server.uri())
        .with_token(TOKEN)
        .with_timeout(Duration::from_millis(100))
        .with_logger(Arc::new(NoopLogger));
    let client = MonobankClient::new(config).unwrap();

    let err = client.public_key(&Request::new()).await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_dry_run_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let endpoints = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&endpoints);
    let options = RunOptions::dry_run_with(move |endpoint, _payload| {
        seen.lock().unwrap().push(endpoint.to_string());
    });

    let response = client
        .verification_with_options(&Request::new().with_amount(100), &options)
        .await
        .unwrap();
    assert!(response.is_none());

    let link = client
        .verification_link_with_options(&Request::new().with_amount(100), &options)
        .await
        .unwrap();
    assert!(link.is_none());

    let endpoints = endpoints.lock().unwrap();
    assert_eq!(endpoints.len(), 2);
    assert_eq!(
        endpoints[0],
        format!("{}/api/merchant/invoice/create", server.uri())
    );
}
