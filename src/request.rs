//! Request builder shared by all client operations.
//!
//! A single [`Request`] value carries everything an operation may need
//! (token, amount, card token, ...). Setters trim their input and ignore blank
//! values, so optional fields can be passed straight from configuration.

use crate::types::{
    InitiationKind, InvoiceCreatePayload, MerchantPaymInfo, PaymentType, SaveCardData,
    WalletPaymentPayload,
};
use crate::utils::non_blank;

/// Unified request for verification, payment, status and public key calls.
///
/// # Examples
///
/// ```
/// use monobank_acquiring::request::Request;
///
/// let request = Request::new()
///     .with_amount(100)
///     .with_webhook_url("https://example.com/webhook")
///     .save_card("wallet-1");
///
/// assert_eq!(request.amount(), 100);
/// assert_eq!(request.wallet_id(), Some("wallet-1"));
/// assert!(request.should_save_card());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    token: Option<String>,
    cms: Option<String>,
    cms_version: Option<String>,
    invoice_id: Option<String>,
    amount: i64,
    currency: Option<i32>,
    payment_type: Option<PaymentType>,
    redirect_url: Option<String>,
    webhook_url: Option<String>,
    validity_seconds: Option<i64>,
    initiation_kind: Option<InitiationKind>,
    merchant_paym_info: Option<MerchantPaymInfo>,
    card_token: Option<String>,
    wallet_id: Option<String>,
    save_card: bool,
}

impl Request {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `X-Token` for this call, overriding the client default.
    pub fn with_token(mut self, token: impl AsRef<str>) -> Self {
        self.token = non_blank(token);
        self
    }

    /// Sets the `X-Cms` header.
    pub fn with_cms(mut self, name: impl AsRef<str>) -> Self {
        if let Some(name) = non_blank(name) {
            self.cms = Some(name);
        }
        self
    }

    /// Sets the `X-Cms-Version` header.
    pub fn with_cms_version(mut self, version: impl AsRef<str>) -> Self {
        if let Some(version) = non_blank(version) {
            self.cms_version = Some(version);
        }
        self
    }

    /// Sets the invoice to query.
    pub fn with_invoice_id(mut self, invoice_id: impl AsRef<str>) -> Self {
        if let Some(invoice_id) = non_blank(invoice_id) {
            self.invoice_id = Some(invoice_id);
        }
        self
    }

    /// Sets the amount in minor units.
    pub fn with_amount(mut self, amount_minor: i64) -> Self {
        self.amount = amount_minor;
        self
    }

    /// Sets the ISO 4217 numeric currency.
    pub fn with_currency(mut self, ccy: i32) -> Self {
        self.currency = Some(ccy);
        self
    }

    /// Sets debit or hold.
    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    /// Sets the customer redirect URL.
    pub fn with_redirect_url(mut self, url: impl AsRef<str>) -> Self {
        if let Some(url) = non_blank(url) {
            self.redirect_url = Some(url);
        }
        self
    }

    /// Sets the webhook URL.
    pub fn with_webhook_url(mut self, url: impl AsRef<str>) -> Self {
        if let Some(url) = non_blank(url) {
            self.webhook_url = Some(url);
        }
        self
    }

    /// Sets invoice validity; non-positive values are ignored.
    pub fn with_validity_seconds(mut self, seconds: i64) -> Self {
        if seconds > 0 {
            self.validity_seconds = Some(seconds);
        }
        self
    }

    /// Sets who initiates a payment by card token.
    pub fn with_initiation_kind(mut self, kind: InitiationKind) -> Self {
        self.initiation_kind = Some(kind);
        self
    }

    /// Replaces the merchant payment info.
    pub fn with_merchant_paym_info(mut self, info: MerchantPaymInfo) -> Self {
        self.merchant_paym_info = Some(info);
        self
    }

    /// Sets the merchant reference.
    pub fn with_reference(mut self, reference: impl AsRef<str>) -> Self {
        if let Some(reference) = non_blank(reference) {
            self.merchant_paym_info.get_or_insert_with(Default::default).reference = reference;
        }
        self
    }

    /// Sets the payment purpose.
    pub fn with_destination(mut self, destination: impl AsRef<str>) -> Self {
        if let Some(destination) = non_blank(destination) {
            self.merchant_paym_info
                .get_or_insert_with(Default::default)
                .destination = destination;
        }
        self
    }

    /// Sets the card token for a payment.
    pub fn with_card_token(mut self, card_token: impl AsRef<str>) -> Self {
        if let Some(card_token) = non_blank(card_token) {
            self.card_token = Some(card_token);
        }
        self
    }

    /// Sets the wallet used for tokenization without enabling it.
    pub fn with_wallet_id(mut self, wallet_id: impl AsRef<str>) -> Self {
        if let Some(wallet_id) = non_blank(wallet_id) {
            self.wallet_id = Some(wallet_id);
        }
        self
    }

    /// Enables tokenization into `wallet_id`.
    pub fn save_card(mut self, wallet_id: impl AsRef<str>) -> Self {
        if let Some(wallet_id) = non_blank(wallet_id) {
            self.wallet_id = Some(wallet_id);
            self.save_card = true;
        }
        self
    }

    /// Enables tokenization with the previously set wallet.
    pub fn enable_save_card(mut self) -> Self {
        self.save_card = true;
        self
    }

    /// Disables tokenization.
    pub fn disable_save_card(mut self) -> Self {
        self.save_card = false;
        self
    }

    /// Per-call token, if set.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// CMS name, if set.
    pub fn cms(&self) -> Option<&str> {
        self.cms.as_deref()
    }

    /// CMS version, if set.
    pub fn cms_version(&self) -> Option<&str> {
        self.cms_version.as_deref()
    }

    /// Invoice id, if set.
    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice_id.as_deref()
    }

    /// Amount in minor units (0 when unset).
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Currency, if set.
    pub fn currency(&self) -> Option<i32> {
        self.currency
    }

    /// Payment type, if set.
    pub fn payment_type(&self) -> Option<PaymentType> {
        self.payment_type
    }

    /// Redirect URL, if set.
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    /// Webhook URL, if set.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    /// Invoice validity, if set.
    pub fn validity_seconds(&self) -> Option<i64> {
        self.validity_seconds
    }

    /// Initiation kind, if set.
    pub fn initiation_kind(&self) -> Option<InitiationKind> {
        self.initiation_kind
    }

    /// Merchant payment info, if set.
    pub fn merchant_paym_info(&self) -> Option<&MerchantPaymInfo> {
        self.merchant_paym_info.as_ref()
    }

    /// Card token, if set.
    pub fn card_token(&self) -> Option<&str> {
        self.card_token.as_deref()
    }

    /// Wallet id, if set.
    pub fn wallet_id(&self) -> Option<&str> {
        self.wallet_id.as_deref()
    }

    /// Whether the invoice should tokenize the card.
    pub fn should_save_card(&self) -> bool {
        self.save_card
    }

    pub(crate) fn invoice_create_payload(&self, amount: i64, ccy: i32) -> InvoiceCreatePayload {
        InvoiceCreatePayload {
            amount,
            ccy,
            merchant_paym_info: self.merchant_paym_info.clone(),
            redirect_url: self.redirect_url.clone(),
            webhook_url: self.webhook_url.clone(),
            validity: self.validity_seconds,
            payment_type: self.payment_type.unwrap_or_default(),
            save_card_data: self.save_card.then(|| SaveCardData {
                save_card: true,
                wallet_id: self.wallet_id.clone(),
            }),
        }
    }

    pub(crate) fn wallet_payment_payload(
        &self,
        card_token: &str,
        amount: i64,
        ccy: i32,
        initiation_kind: InitiationKind,
    ) -> WalletPaymentPayload {
        WalletPaymentPayload {
            card_token: card_token.to_string(),
            amount,
            ccy,
            redirect_url: self.redirect_url.clone(),
            webhook_url: self.webhook_url.clone(),
            initiation_kind,
            merchant_paym_info: self.merchant_paym_info.clone(),
            payment_type: self.payment_type.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CURRENCY_UAH;

    #[test]
    fn test_setters_trim_and_ignore_blank() {
        let request = Request::new()
            .with_webhook_url("  https://example.com/webhook  ")
            .with_invoice_id("   ")
            .with_cms(" shop ")
            .with_validity_seconds(-5);

        assert_eq!(request.webhook_url(), Some("https://example.com/webhook"));
        assert_eq!(request.invoice_id(), None);
        assert_eq!(request.cms(), Some("shop"));
        assert_eq!(request.validity_seconds(), None);
    }

    #[test]
    fn test_save_card_toggles() {
        let request = Request::new().with_wallet_id("wallet-1").enable_save_card();
        assert_eq!(request.wallet_id(), Some("wallet-1"));
        assert!(request.should_save_card());

        let request = request.disable_save_card();
        assert!(!request.should_save_card());

        let request = request.save_card("wallet-2");
        assert_eq!(request.wallet_id(), Some("wallet-2"));
        assert!(request.should_save_card());
    }

    #[test]
    fn test_merchant_paym_info_setters() {
        let request = Request::new()
            .with_reference("order-1")
            .with_destination("Subscription");
        let info = request.merchant_paym_info().unwrap();
        assert_eq!(info.reference, "order-1");
        assert_eq!(info.destination, "Subscription");
    }

    #[test]
    fn test_invoice_create_payload_defaults() {
        let request = Request::new().with_amount(500).save_card("wallet-1");
        let payload = request.invoice_create_payload(500, CURRENCY_UAH);

        assert_eq!(payload.payment_type, PaymentType::Debit);
        assert_eq!(
            payload.save_card_data,
            Some(SaveCardData {
                save_card: true,
                wallet_id: Some("wallet-1".to_string()),
            })
        );

        let payload = Request::new().invoice_create_payload(500, CURRENCY_UAH);
        assert!(payload.save_card_data.is_none());
    }

    #[test]
    fn test_wallet_payment_payload() {
        let request = Request::new()
            .with_payment_type(PaymentType::Hold)
            .with_redirect_url("https://example.com/return");
        let payload =
            request.wallet_payment_payload("tok-1", 250, CURRENCY_UAH, InitiationKind::Client);

        assert_eq!(payload.card_token, "tok-1");
        assert_eq!(payload.payment_type, PaymentType::Hold);
        assert_eq!(payload.redirect_url.as_deref(), Some("https://example.com/return"));
    }
}
