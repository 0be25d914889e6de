//! Business-level payment failures.
//!
//! Invoice status and webhook payloads report declined or failed payments via
//! `errCode` and `failureReason`. [`PaymentError`] gathers those fields together
//! with human-readable descriptions from the acquiring error catalog. It is not
//! an HTTP failure; non-2xx responses are reported as [`ApiError`](crate::ApiError).

use crate::errors::{MonobankError, Result};
use crate::types::{InvoiceStatus, InvoiceStatusResponse, WalletPaymentResponse};
use std::collections::BTreeSet;
use std::fmt;

/// Who should act on a payment failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Contact {
    /// The customer should contact the card issuing bank.
    IssuingBank,
    /// The merchant should contact monobank support.
    Monobank,
    /// The customer has to fix input or retry.
    Customer,
    /// The integration or merchant configuration should be checked.
    Api,
}

impl Contact {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Contact::IssuingBank => "issuing bank",
            Contact::Monobank => "monobank support",
            Contact::Customer => "customer",
            Contact::Api => "api/integration team",
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog description of a payment `errCode`.
///
/// The `failureReason` sent by the API is still the most precise explanation;
/// this is a best-effort companion to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentErrorMeta {
    /// Error code as sent by the API.
    pub code: &'static str,
    /// Short explanation.
    pub text: &'static str,
    /// Who should act on it.
    pub contact: Contact,
}

impl PaymentErrorMeta {
    /// A practical next step for the contact target.
    pub fn handling_hint(&self) -> &'static str {
        match self.contact {
            Contact::IssuingBank => {
                "Ask customer to contact the issuing bank and verify card restrictions/limits."
            }
            Contact::Monobank => {
                "Contact monobank support and provide invoiceId + errCode for investigation."
            }
            Contact::Customer => {
                "Ask customer to fix input/payment details and retry the payment flow."
            }
            Contact::Api => {
                "Review integration/request validation and merchant configuration in API settings."
            }
        }
    }
}

const fn meta(code: &'static str, text: &'static str, contact: Contact) -> PaymentErrorMeta {
    PaymentErrorMeta {
        code,
        text,
        contact,
    }
}

use Contact::{Api, Customer, IssuingBank, Monobank};

// Some codes are documented twice with different meanings; entries for the
// same code stay adjacent and in documentation order.
static CATALOG: &[PaymentErrorMeta] = &[
    meta("6", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("40", "Card is reported as lost. Spending is restricted.", IssuingBank),
    meta("41", "Card is reported as lost. Spending is restricted.", IssuingBank),
    meta("50", "Card spending is restricted.", IssuingBank),
    meta("51", "The card has expired.", IssuingBank),
    meta("52", "Card number is invalid.", IssuingBank),
    meta("54", "A technical failure occurred.", IssuingBank),
    meta("55", "Merchant configuration error.", Monobank),
    meta("56", "Card type does not support this payment.", IssuingBank),
    meta("57", "Transaction is not supported.", IssuingBank),
    meta("58", "Card spending for purchases is restricted.", IssuingBank),
    meta("58", "Card spending is restricted.", IssuingBank),
    meta("59", "Insufficient funds to complete the purchase.", IssuingBank),
    meta("60", "Card spending transactions count limit exceeded.", IssuingBank),
    meta("61", "Card internet payment limit exceeded.", IssuingBank),
    meta("62", "PIN retry attempts limit is reached or exceeded.", IssuingBank),
    meta("63", "Card internet payment limit exceeded.", IssuingBank),
    meta("67", "Merchant configuration error.", Monobank),
    meta("68", "Payment system declined the transaction.", IssuingBank),
    meta("71", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("72", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("73", "Routing error.", Monobank),
    meta("74", "Merchant configuration error.", Monobank),
    meta("75", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("80", "Invalid CVV code.", IssuingBank),
    meta("81", "Invalid CVV2 code.", IssuingBank),
    meta("82", "Transaction is not allowed under these conditions.", IssuingBank),
    meta("82", "Merchant configuration error.", Monobank),
    meta("83", "Card payment attempts limit exceeded.", IssuingBank),
    meta("84", "Invalid 3-D Secure CAVV value.", Monobank),
    meta("98", "Merchant configuration error.", Monobank),
    meta("1000", "Internal technical failure.", Monobank),
    meta("1005", "Internal technical failure.", Monobank),
    meta("1010", "Internal technical failure.", Monobank),
    meta("1014", "Full card details are required to process payment.", Customer),
    meta("1034", "3-D Secure verification failed.", IssuingBank),
    meta("1035", "3-D Secure verification failed.", IssuingBank),
    meta("1036", "Internal technical failure.", Monobank),
    meta("1044", "Merchant configuration error.", Monobank),
    meta("1045", "3-D Secure verification failed.", IssuingBank),
    meta("1053", "Merchant configuration error.", Monobank),
    meta("1054", "3-D Secure verification failed.", Monobank),
    meta("1056", "Transfer is allowed only to cards issued by Ukrainian banks.", Monobank),
    meta("1064", "Payment is allowed only with Mastercard or Visa cards.", IssuingBank),
    meta("1066", "Merchant configuration error.", Monobank),
    meta("1077", "Payment amount is below minimum allowed amount (payment system settings).", Api),
    meta("1080", "Card expiry date is invalid.", IssuingBank),
    meta("1090", "Customer information not found.", Monobank),
    meta("1115", "Merchant configuration error.", Monobank),
    meta("1121", "Merchant configuration error.", Monobank),
    meta("1145", "Minimum transfer amount is not met.", Monobank),
    meta("1165", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("1187", "Receiver name must be provided.", Api),
    meta("1193", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("1194", "This top-up method works only with cards issued by other banks.", Monobank),
    meta("1200", "CVV code is required.", IssuingBank),
    meta("1405", "Payment system transfer limits reached.", IssuingBank),
    meta("1406", "Card is blocked by risk management.", IssuingBank),
    meta("1407", "Transaction is blocked by risk management.", Monobank),
    meta("1408", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("1411", "This type of operation from UAH cards is temporarily restricted.", Monobank),
    meta("1413", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("1419", "Card expiry date is invalid.", IssuingBank),
    meta("1420", "Internal technical failure.", Monobank),
    meta("1421", "3-D Secure verification failed.", IssuingBank),
    meta("1422", "Error occurred during 3-D Secure step.", IssuingBank),
    meta("1425", "Error occurred during 3-D Secure step.", IssuingBank),
    meta("1428", "Transaction is blocked by the issuing bank.", IssuingBank),
    meta("1429", "3-D Secure verification failed.", IssuingBank),
    meta(
        "1433",
        "Check receiver first and last name. If data is invalid, bank can reject the transfer.",
        Monobank,
    ),
    meta("1436", "Payment rejected due to policy restrictions.", Monobank),
    meta("1439", "Operation is not allowed under the eRecovery program.", Monobank),
    meta("1458", "Transaction rejected at 3DS step.", IssuingBank),
    meta("8001", "Payment link has expired.", Customer),
    meta("8002", "Customer cancelled the payment.", Customer),
    meta("8003", "Technical failure occurred.", Monobank),
    meta("8004", "3-D Secure processing problem.", IssuingBank),
    meta("8005", "Payment acceptance limits exceeded.", Monobank),
    meta("8006", "Payment acceptance limits exceeded.", Monobank),
];

/// Looks up catalog entries for a payment `errCode`.
///
/// Returns `None` for blank or unknown codes.
///
/// # Examples
///
/// ```
/// use monobank_acquiring::payment_errors::{lookup_payment_error_metas, Contact};
///
/// let metas = lookup_payment_error_metas(" 59 ").unwrap();
/// assert_eq!(metas[0].text, "Insufficient funds to complete the purchase.");
/// assert_eq!(metas[0].contact, Contact::IssuingBank);
///
/// assert!(lookup_payment_error_metas("0").is_none());
/// ```
pub fn lookup_payment_error_metas(code: &str) -> Option<Vec<PaymentErrorMeta>> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    let metas: Vec<PaymentErrorMeta> = CATALOG
        .iter()
        .filter(|meta| meta.code == code)
        .copied()
        .collect();
    if metas.is_empty() {
        None
    } else {
        Some(metas)
    }
}

/// A declined or failed payment reported by a status or webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentError {
    /// Invoice the failure belongs to.
    pub invoice_id: String,
    /// Invoice status at the time of the report.
    pub status: InvoiceStatus,
    /// Payment `errCode`, may be empty.
    pub err_code: String,
    /// `failureReason` from the API, or a synthesized one for bare failures.
    pub failure_reason: String,
    /// Catalog entries for `err_code`.
    pub metas: Vec<PaymentErrorMeta>,
}

impl PaymentError {
    /// Builds a payment error from payload fields.
    ///
    /// Returns `None` when there is neither a code nor a reason and the status
    /// is not a failure. A failure status without details gets a synthesized
    /// reason.
    pub fn from_parts(
        invoice_id: &str,
        status: InvoiceStatus,
        err_code: Option<&str>,
        failure_reason: Option<&str>,
    ) -> Option<Self> {
        let code = err_code.map(str::trim).unwrap_or_default().to_string();
        let mut reason = failure_reason.map(str::trim).unwrap_or_default().to_string();

        if code.is_empty() && reason.is_empty() {
            if !status.is_failure() {
                return None;
            }
            reason = format!("payment status indicates failure: {}", status);
        }

        let metas = lookup_payment_error_metas(&code).unwrap_or_default();
        Some(Self {
            invoice_id: invoice_id.trim().to_string(),
            status,
            err_code: code,
            failure_reason: reason,
            metas,
        })
    }

    /// First catalog entry, if any.
    pub fn primary_meta(&self) -> Option<&PaymentErrorMeta> {
        self.metas.first()
    }

    /// Distinct catalog explanations, in catalog order.
    pub fn explanations(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::with_capacity(self.metas.len());
        for meta in &self.metas {
            if !out.contains(&meta.text) {
                out.push(meta.text);
            }
        }
        out
    }

    /// Distinct contact targets, sorted by label.
    pub fn contacts(&self) -> Vec<&'static str> {
        self.metas
            .iter()
            .map(|meta| meta.contact.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct next-step hints, in catalog order.
    pub fn handling_hints(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::with_capacity(self.metas.len());
        for meta in &self.metas {
            let hint = meta.handling_hint();
            if !out.contains(&hint) {
                out.push(hint);
            }
        }
        out
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("payment error")?;
        if !self.invoice_id.is_empty() {
            write!(f, " invoiceId={}", self.invoice_id)?;
        }
        let status = self.status.as_str().trim();
        if !status.is_empty() {
            write!(f, " status={}", status)?;
        }
        if !self.err_code.is_empty() {
            write!(f, " errCode={}", self.err_code)?;
        }
        if !self.failure_reason.is_empty() {
            write!(f, " reason={}", self.failure_reason)?;
        }
        match self.metas.as_slice() {
            [] => {}
            [only] => write!(f, " contact={}", only.contact)?,
            many => write!(f, " contact={}-options", many.len())?,
        }
        Ok(())
    }
}

impl std::error::Error for PaymentError {}

impl InvoiceStatusResponse {
    /// Payment failure carried by this status or webhook payload, if any.
    pub fn payment_error(&self) -> Option<PaymentError> {
        PaymentError::from_parts(
            &self.invoice_id,
            self.status.clone(),
            self.err_code.as_deref(),
            self.failure_reason.as_deref(),
        )
    }

    /// Fails with [`MonobankError::Payment`] when the payload reports a payment failure.
    pub fn require_no_payment_error(&self) -> Result<()> {
        match self.payment_error() {
            Some(err) => Err(MonobankError::Payment(err)),
            None => Ok(()),
        }
    }
}

impl WalletPaymentResponse {
    /// Payment failure carried by this response, if any.
    ///
    /// This response has no `errCode`; query the invoice status for it.
    pub fn payment_error(&self) -> Option<PaymentError> {
        PaymentError::from_parts(
            &self.invoice_id,
            self.status.clone(),
            None,
            self.failure_reason.as_deref(),
        )
    }

    /// Fails with [`MonobankError::Payment`] when the response reports a payment failure.
    pub fn require_no_payment_error(&self) -> Result<()> {
        match self.payment_error() {
            Some(err) => Err(MonobankError::Payment(err)),
            None => Ok(()),
        }
    }
}
