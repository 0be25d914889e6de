//! Classification of completed HTTP exchanges.
//!
//! A 2xx response is decoded into the caller's target type. Anything else
//! becomes an [`ApiError`] whose kind is derived from the status code, with
//! the business `errCode`/description extracted best-effort from the body and,
//! for 429, the `Retry-After` delay.
//!
//! Classification is pure: it never logs and never retries. The client logs
//! the outcome according to its severity policy.

use crate::errors::{ApiError, ErrorKind, MonobankError, Result};
use crate::transport::HttpResponse;
use crate::utils::{first_non_empty, trim_body, value_to_string, MAX_BODY_SNIPPET};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Decodes a 2xx response into `T`, or classifies the failure.
///
/// `endpoint` is the request path used for diagnostics.
///
/// # Errors
///
/// - [`MonobankError::Api`] for non-2xx statuses
/// - [`MonobankError::UnexpectedResponse`] for a 2xx response with an empty body
/// - [`MonobankError::Decode`] when the body is not valid JSON for `T`
pub fn classify_response<T: DeserializeOwned>(
    method: &Method,
    endpoint: &str,
    response: &HttpResponse,
) -> Result<T> {
    check_status(method, endpoint, response)?;

    if response.body.is_empty() {
        return Err(MonobankError::UnexpectedResponse {
            op: "decode",
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status_code: response.status,
            message: "empty response body".to_string(),
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| {
        MonobankError::decode(
            "decode",
            "json unmarshal response",
            trim_body(&response.body, MAX_BODY_SNIPPET),
            Some(Box::new(e)),
        )
    })
}

/// Checks that the response is 2xx without decoding its body.
pub fn check_status(method: &Method, endpoint: &str, response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(api_error_from_response(method, endpoint, response).into())
    }
}

/// Builds the [`ApiError`] describing a non-2xx response.
pub fn api_error_from_response(
    method: &Method,
    endpoint: &str,
    response: &HttpResponse,
) -> ApiError {
    let (err_code, description) = parse_api_error_body(&response.body);

    let retry_after = if response.status == 429 {
        response.header(RETRY_AFTER.as_str()).and_then(parse_retry_after)
    } else {
        None
    };

    ApiError {
        kind: ErrorKind::from_status(response.status),
        method: method.to_string(),
        endpoint: endpoint.to_string(),
        status_code: response.status,
        content_type: response.content_type().map(str::to_string),
        err_code,
        description,
        body: trim_body(&response.body, MAX_BODY_SNIPPET),
        retry_after,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiErrorBody {
    err_code: Option<Value>,
    err_text: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<String>,
    description: Option<String>,
    detail: Option<String>,
}

const DESCRIPTION_FIELDS: [&str; 6] = [
    "errText",
    "errorDescription",
    "message",
    "error",
    "description",
    "detail",
];

/// Extracts `(errCode, description)` from an error response body.
///
/// Both parts may be empty. When no known description field is present the
/// trimmed raw body is used as the description.
///
/// # Examples
///
/// ```
/// use monobank_acquiring::classify::parse_api_error_body;
///
/// let (code, desc) = parse_api_error_body(br#"{"errCode":82,"message":"declined"}"#);
/// assert_eq!(code, "82");
/// assert_eq!(desc, "declined");
///
/// let (code, desc) = parse_api_error_body(b" Bad Gateway ");
/// assert_eq!(code, "");
/// assert_eq!(desc, "Bad Gateway");
/// ```
pub fn parse_api_error_body(body: &[u8]) -> (String, String) {
    if body.is_empty() {
        return (String::new(), String::new());
    }
    let raw = String::from_utf8_lossy(body).trim().to_string();

    // Arrays would fill the struct by position, so only objects are searched.
    let value = match serde_json::from_slice::<Value>(body) {
        Ok(value) if value.is_object() => value,
        _ => return (String::new(), raw),
    };

    if let Ok(parsed) = ApiErrorBody::deserialize(&value) {
        let err_code = parsed.err_code.as_ref().map(value_to_string).unwrap_or_default();
        let description = first_non_empty(
            [
                &parsed.err_text,
                &parsed.error_description,
                &parsed.message,
                &parsed.error,
                &parsed.description,
                &parsed.detail,
            ]
            .into_iter()
            .map(|field| field.as_deref().unwrap_or_default()),
        )
        .map(str::to_string)
        .unwrap_or(raw);
        return (err_code, description);
    }

    // A description field with a non-string value ends up here.
    if let Some(map) = value.as_object() {
        let err_code = map.get("errCode").map(value_to_string).unwrap_or_default();
        let rendered: Vec<String> = DESCRIPTION_FIELDS
            .iter()
            .map(|field| map.get(*field).map(value_to_string).unwrap_or_default())
            .collect();
        let mut description = first_non_empty(rendered.iter().map(String::as_str))
            .map(str::to_string)
            .unwrap_or_default();

        if description.is_empty() && map.len() == 1 {
            if let Some(only) = map.values().next() {
                description = value_to_string(only);
            }
        }
        if description.is_empty() {
            description = raw;
        }
        return (err_code, description.trim().to_string());
    }

    (String::new(), raw)
}

/// Parses a `Retry-After` header value relative to the current time.
///
/// Accepts delta-seconds or an HTTP-date. Negative seconds and dates in the
/// past yield a zero delay; anything else unparseable yields `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

/// Same as [`parse_retry_after`] with an explicit "now".
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use monobank_acquiring::classify::parse_retry_after_at;
/// use std::time::Duration;
///
/// let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
/// assert_eq!(parse_retry_after_at("120", now), Some(Duration::from_secs(120)));
/// assert_eq!(
///     parse_retry_after_at("Wed, 21 Oct 2015 07:29:00 GMT", now),
///     Some(Duration::from_secs(60))
/// );
/// assert_eq!(parse_retry_after_at("soon", now), None);
/// ```
pub fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<i64>() {
        return Some(Duration::from_secs(secs.max(0) as u64));
    }

    let at = parse_http_date(value)?;
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// IMF-fixdate, RFC 850 or asctime.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Created {
        invoice_id: String,
    }

    fn get() -> Method {
        Method::GET
    }

    #[test]
    fn test_success_decodes() {
        let response = HttpResponse::new(200).with_body(r#"{"invoiceId":"inv-1"}"#);
        let created: Created =
            classify_response(&get(), "/api/merchant/invoice/create", &response).unwrap();
        assert_eq!(created.invoice_id, "inv-1");
    }

    #[test]
    fn test_not_found() {
        let response = HttpResponse::new(404)
            .with_body(r#"{"errCode":"NOT_FOUND","errText":"invoice not found"}"#);
        let err = classify_response::<Created>(&get(), "/api/merchant/invoice/status", &response)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        let api = err.api_error().unwrap();
        assert_eq!(api.status_code, 404);
        assert_eq!(api.method, "GET");
        assert_eq!(api.endpoint, "/api/merchant/invoice/status");
        assert_eq!(api.err_code, "NOT_FOUND");
        assert_eq!(api.description, "invoice not found");
        assert!(api.retry_after.is_none());
    }

    #[test]
    fn test_rate_limited_with_retry_after() {
        let response = HttpResponse::new(429)
            .with_header("Retry-After", "5")
            .with_body(r#"{"errText":"too many requests"}"#);
        let err = check_status(&get(), "/api/merchant/pubkey", &response).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retry_after_ignored_outside_429() {
        let response = HttpResponse::new(503).with_header("Retry-After", "5");
        let err = check_status(&get(), "/api/merchant/pubkey", &response).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert!(err.retry_after().is_none());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_success_body() {
        let response = HttpResponse::new(201);
        let err =
            classify_response::<Created>(&Method::POST, "/api/merchant/invoice/create", &response)
                .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnexpectedResponse);
        match err {
            MonobankError::UnexpectedResponse { op, status_code, message, .. } => {
                assert_eq!(op, "decode");
                assert_eq!(status_code, 201);
                assert_eq!(message, "empty response body");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_success_body() {
        let body = format!("{{\"invoiceId\": {}", "x".repeat(MAX_BODY_SNIPPET));
        let response = HttpResponse::new(200).with_body(body);
        let err = classify_response::<Created>(&get(), "/api/merchant/invoice/status", &response)
            .unwrap_err();

        match err {
            MonobankError::Decode { message, body, .. } => {
                assert_eq!(message, "json unmarshal response");
                assert_eq!(body.len(), MAX_BODY_SNIPPET);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_err_code_at_402() {
        let response = HttpResponse::new(402)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"errCode": 82, "message": "declined"}"#);
        let err =
            check_status(&Method::POST, "/api/merchant/wallet/payment", &response).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnexpectedResponse);
        let api = err.api_error().unwrap();
        assert_eq!(api.err_code, "82");
        assert_eq!(api.description, "declined");
        assert_eq!(api.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_parse_api_error_body_fallbacks() {
        // description precedence
        assert_eq!(
            parse_api_error_body(br#"{"detail":"d","errText":"  ","message":"m"}"#),
            (String::new(), "m".to_string())
        );

        // non-string description field forces the generic map path
        assert_eq!(
            parse_api_error_body(br#"{"errCode":"E1","message":{"text":"nested"}}"#),
            ("E1".to_string(), r#"{"text":"nested"}"#.to_string())
        );

        assert_eq!(
            parse_api_error_body(br#"{"message": 5}"#),
            (String::new(), "5".to_string())
        );
        assert_eq!(
            parse_api_error_body(br#"{"msg":true, "error": 7}"#),
            (String::new(), "7".to_string())
        );

        // no known fields
        assert_eq!(
            parse_api_error_body(br#"{"errCode":1005}"#),
            ("1005".to_string(), r#"{"errCode":1005}"#.to_string())
        );

        // not an object
        assert_eq!(
            parse_api_error_body(b"<html>502</html>\n"),
            (String::new(), "<html>502</html>".to_string())
        );
        assert_eq!(parse_api_error_body(b""), (String::new(), String::new()));

        // arrays never supply a code or description
        assert_eq!(
            parse_api_error_body(b"[82]"),
            (String::new(), "[82]".to_string())
        );
        assert_eq!(
            parse_api_error_body(br#"["oops","x"]"#),
            (String::new(), r#"["oops","x"]"#.to_string())
        );
        assert_eq!(
            parse_api_error_body(b"\"declined\""),
            (String::new(), "\"declined\"".to_string())
        );
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = Utc::now();
        assert_eq!(parse_retry_after_at("0", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after_at(" 7 ", now), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after_at("-3", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after_at("", now), None);
        assert_eq!(parse_retry_after_at("1.5", now), None);
    }

    #[test]
    fn test_parse_retry_after_dates() {
        let now = Utc.with_ymd_and_hms(1994, 11, 16, 8, 49, 0).unwrap();

        assert_eq!(
            parse_retry_after_at("Wed, 16 Nov 1994 08:49:37 GMT", now),
            Some(Duration::from_secs(37))
        );
        assert_eq!(
            parse_retry_after_at("Wednesday, 16-Nov-94 08:49:37 GMT", now),
            Some(Duration::from_secs(37))
        );
        assert_eq!(
            parse_retry_after_at("Wed Nov 16 08:49:37 1994", now),
            Some(Duration::from_secs(37))
        );

        // past dates clamp to zero
        assert_eq!(
            parse_retry_after_at("Sun, 06 Nov 1994 08:49:37 GMT", now),
            Some(Duration::ZERO)
        );
    }
}
