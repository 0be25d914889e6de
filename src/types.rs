//! Core type definitions for the monobank acquiring API.
//!
//! Response structures tolerate missing fields (webhook payloads and status
//! responses only carry what is relevant to the current invoice state).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use url::Url;

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.monobank.ua";

/// `POST` invoice creation (also used for card verification/tokenization).
pub const PATH_INVOICE_CREATE: &str = "/api/merchant/invoice/create";
/// `GET` invoice status.
pub const PATH_INVOICE_STATUS: &str = "/api/merchant/invoice/status";
/// `POST` payment by card token.
pub const PATH_WALLET_PAYMENT: &str = "/api/merchant/wallet/payment";
/// `GET` webhook verification public key.
pub const PATH_PUBKEY: &str = "/api/merchant/pubkey";

/// Header carrying the merchant token.
pub const HEADER_TOKEN: &str = "X-Token";
/// Header carrying the CMS name.
pub const HEADER_CMS: &str = "X-Cms";
/// Header carrying the CMS version.
pub const HEADER_CMS_VERSION: &str = "X-Cms-Version";
/// Webhook signature header.
pub const HEADER_SIGN: &str = "X-Sign";

/// ISO 4217 numeric code for the Ukrainian hryvnia, the API default.
pub const CURRENCY_UAH: i32 = 980;

/// Operation type of an invoice or payment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Regular debit
    #[default]
    Debit,
    /// Hold, finalized later
    Hold,
}

/// Who initiated a payment by card token.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitiationKind {
    /// Merchant-initiated (recurring charges)
    Merchant,
    /// Customer-initiated; requires a redirect URL
    Client,
}

/// Invoice/payment state.
///
/// Unknown values are preserved verbatim so that new API states do not break
/// decoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    /// Invoice created, awaiting payment
    Created,
    /// Payment in progress
    Processing,
    /// Paid
    Success,
    /// Payment failed
    Failure,
    /// Payment reversed
    Reversed,
    /// Invoice expired
    Expired,
    /// Any other value
    Unknown(String),
}

impl InvoiceStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Created => "created",
            InvoiceStatus::Processing => "processing",
            InvoiceStatus::Success => "success",
            InvoiceStatus::Failure => "failure",
            InvoiceStatus::Reversed => "reversed",
            InvoiceStatus::Expired => "expired",
            InvoiceStatus::Unknown(other) => other,
        }
    }

    /// The invoice will not change state any more.
    pub fn is_final(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    /// The invoice was paid.
    pub fn is_success(&self) -> bool {
        matches!(self, InvoiceStatus::Success)
    }

    /// The invoice ended without a successful payment.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Failure | InvoiceStatus::Reversed | InvoiceStatus::Expired
        )
    }

    /// The invoice is still in progress.
    pub fn is_pending(&self) -> bool {
        matches!(self, InvoiceStatus::Created | InvoiceStatus::Processing)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unknown(String::new())
    }
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "created" => InvoiceStatus::Created,
            "processing" => InvoiceStatus::Processing,
            "success" => InvoiceStatus::Success,
            "failure" => InvoiceStatus::Failure,
            "reversed" => InvoiceStatus::Reversed,
            "expired" => InvoiceStatus::Expired,
            _ => InvoiceStatus::Unknown(value),
        }
    }
}

impl From<&str> for InvoiceStatus {
    fn from(value: &str) -> Self {
        InvoiceStatus::from(value.to_string())
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant payment info attached to an invoice (subset of the API object).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MerchantPaymInfo {
    /// Merchant reference (order number)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
    /// Payment purpose
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination: String,
    /// Free-form comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Receipt e-mails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customer_emails: Vec<String>,
}

/// Card tokenization settings of an invoice.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveCardData {
    /// Save the card after payment
    pub save_card: bool,
    /// Merchant-defined customer wallet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
}

/// Body of `POST /api/merchant/invoice/create`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreatePayload {
    /// Amount in minor units
    pub amount: i64,
    /// ISO 4217 numeric currency
    pub ccy: i32,
    /// Merchant payment info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_paym_info: Option<MerchantPaymInfo>,
    /// Customer redirect after payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Webhook URL for status notifications
    #[serde(rename = "webHookUrl", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Invoice validity in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<i64>,
    /// Debit or hold
    pub payment_type: PaymentType,
    /// Tokenization settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_card_data: Option<SaveCardData>,
}

/// Body of `POST /api/merchant/wallet/payment`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletPaymentPayload {
    /// Card token from a previous tokenization
    pub card_token: String,
    /// Amount in minor units
    pub amount: i64,
    /// ISO 4217 numeric currency
    pub ccy: i32,
    /// Customer redirect (3-D Secure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Webhook URL for status notifications
    #[serde(rename = "webHookUrl", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Who initiated the charge
    pub initiation_kind: InitiationKind,
    /// Merchant payment info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_paym_info: Option<MerchantPaymInfo>,
    /// Debit or hold
    pub payment_type: PaymentType,
}

/// Response of `POST /api/merchant/invoice/create`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceCreateResponse {
    /// Invoice identifier
    #[serde(deserialize_with = "null_as_default")]
    pub invoice_id: String,
    /// Payment page for the customer
    #[serde(deserialize_with = "null_as_default")]
    pub page_url: String,
}

impl InvoiceCreateResponse {
    /// Parses `pageUrl`, which must be an absolute URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use monobank_acquiring::types::InvoiceCreateResponse;
    ///
    /// let response = InvoiceCreateResponse {
    ///     invoice_id: "inv-1".to_string(),
    ///     page_url: "https://pay.monobank.ua/inv-1".to_string(),
    /// };
    /// assert_eq!(response.parsed_page_url().unwrap().host_str(), Some("pay.monobank.ua"));
    /// ```
    pub fn parsed_page_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.page_url.trim())
    }
}

/// Response of `POST /api/merchant/wallet/payment`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletPaymentResponse {
    /// Invoice identifier
    #[serde(deserialize_with = "null_as_default")]
    pub invoice_id: String,
    /// 3-D Secure page, when the customer has to confirm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tds_url: Option<String>,
    /// Payment state
    #[serde(deserialize_with = "null_as_default")]
    pub status: InvoiceStatus,
    /// Failure explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Amount in minor units
    #[serde(deserialize_with = "null_as_default")]
    pub amount: i64,
    /// ISO 4217 numeric currency
    #[serde(deserialize_with = "null_as_default")]
    pub ccy: i32,
    /// Creation time
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification time
    pub modified_date: Option<DateTime<Utc>>,
}

impl WalletPaymentResponse {
    /// The customer must pass a 3-D Secure challenge at `tds_url`.
    pub fn requires_3ds(&self) -> bool {
        self.tds_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Response of `GET /api/merchant/invoice/status`; also the webhook body.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceStatusResponse {
    /// Invoice identifier
    #[serde(deserialize_with = "null_as_default")]
    pub invoice_id: String,
    /// Invoice state
    #[serde(deserialize_with = "null_as_default")]
    pub status: InvoiceStatus,
    /// Failure explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Business error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_code: Option<String>,
    /// Amount in minor units
    #[serde(deserialize_with = "null_as_default")]
    pub amount: i64,
    /// ISO 4217 numeric currency
    #[serde(deserialize_with = "null_as_default")]
    pub ccy: i32,
    /// Final amount after holds/reversals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<i64>,
    /// Creation time
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification time
    pub modified_date: Option<DateTime<Utc>>,
    /// Merchant reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Payment purpose
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Cancellations and reversals
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(deserialize_with = "null_as_default")]
    pub cancel_list: Vec<CancelItem>,
    /// Card and processing details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
    /// Tokenization result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_data: Option<WalletData>,
    /// Tips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tips_info: Option<TipsInfo>,
}

/// A cancellation attached to an invoice.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelItem {
    /// Cancellation state
    #[serde(deserialize_with = "null_as_default")]
    pub status: InvoiceStatus,
    /// Amount in minor units
    #[serde(deserialize_with = "null_as_default")]
    pub amount: i64,
    /// ISO 4217 numeric currency
    #[serde(deserialize_with = "null_as_default")]
    pub ccy: i32,
    /// Creation time
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification time
    pub modified_date: Option<DateTime<Utc>>,
    /// Authorization code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_code: Option<String>,
    /// Retrieval reference number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrn: Option<String>,
    /// Merchant cancellation reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext_ref: Option<String>,
    /// Masked card number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_pan: Option<String>,
}

/// Card and processing details of a payment.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentInfo {
    /// Masked card number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_pan: Option<String>,
    /// Authorization code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_code: Option<String>,
    /// Retrieval reference number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrn: Option<String>,
    /// Processing transaction id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tran_id: Option<String>,
    /// Terminal id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    /// Card scheme (visa, mastercard)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_system: Option<String>,
    /// pan, apple, google, wallet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Acquiring fee in minor units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<i64>,
}

/// Tokenization result.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletData {
    /// Token for later charges
    #[serde(deserialize_with = "null_as_default")]
    pub card_token: String,
    /// Merchant wallet identifier
    #[serde(deserialize_with = "null_as_default")]
    pub wallet_id: String,
    /// Tokenization state
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

/// Tips attached to a payment.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TipsInfo {
    /// Employee receiving the tips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// Tips amount in minor units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

/// Response of `GET /api/merchant/pubkey`: base64-encoded PEM public key.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PublicKeyResponse {
    /// Base64 of the PEM-encoded key
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
}

/// Decodes `null` as the type's default, the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

macro_rules! status_helpers {
    ($ty:ty) => {
        impl $ty {
            /// See [`InvoiceStatus::is_final`].
            pub fn is_final(&self) -> bool {
                self.status.is_final()
            }

            /// See [`InvoiceStatus::is_success`].
            pub fn is_success(&self) -> bool {
                self.status.is_success()
            }

            /// See [`InvoiceStatus::is_failure`].
            pub fn is_failure(&self) -> bool {
                self.status.is_failure()
            }

            /// See [`InvoiceStatus::is_pending`].
            pub fn is_pending(&self) -> bool {
                self.status.is_pending()
            }
        }
    };
}

status_helpers!(InvoiceStatusResponse);
status_helpers!(WalletPaymentResponse);
