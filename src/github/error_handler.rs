//! GitHub API error detection and classification
//!
//! Turns non-success responses from a host into a `HubAuthError` whose
//! variant the login pipeline can branch on, and recognizes two-factor
//! challenges in `X-GitHub-OTP` headers.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::HubAuthError;
use crate::github::two_factor::TwoFactorType;

/// Header GitHub uses to demand and receive one-time codes
pub const OTP_HEADER: &str = "X-GitHub-OTP";

/// Matches `required; sms` / `required; app`
static OTP_REQUIRED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*required\s*;\s*([a-z]+)\s*$")
        .expect("Invalid regex pattern for OTP header detection")
});

/// Error body returned by the GitHub REST API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Two-factor method demanded by an `X-GitHub-OTP` header value, if any
pub fn two_factor_required(header_value: &str) -> Option<TwoFactorType> {
    OTP_REQUIRED_PATTERN
        .captures(header_value)
        .and_then(|caps| caps.get(1))
        .map(|m| TwoFactorType::from_header_value(m.as_str()))
}

/// Extract a readable message from an error body
///
/// Falls back to the raw body (or the status reason) when the body is not
/// the usual `{"message": ...}` JSON.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        let details: Vec<String> = parsed
            .errors
            .iter()
            .filter_map(|detail| {
                detail.message.clone().or_else(|| {
                    match (detail.field.as_deref(), detail.code.as_deref()) {
                        (Some(field), Some(code)) => Some(format!("{} {}", field, code)),
                        _ => None,
                    }
                })
            })
            .collect();

        if details.is_empty() {
            return parsed.message;
        }
        return format!("{} ({})", parsed.message, details.join(", "));
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Classify a non-success response into a `HubAuthError`
pub fn classify_response(status: StatusCode, body: &str) -> HubAuthError {
    HubAuthError::from_status(status, error_message(status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_factor_required_detection() {
        assert_eq!(two_factor_required("required; sms"), Some(TwoFactorType::Sms));
        assert_eq!(
            two_factor_required("Required;app"),
            Some(TwoFactorType::AuthenticatorApp)
        );
        assert_eq!(
            two_factor_required("required; unknown"),
            Some(TwoFactorType::Unknown)
        );
        assert_eq!(two_factor_required("optional"), None);
    }

    #[test]
    fn test_message_from_json_body() {
        let body = r#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#;
        assert_eq!(error_message(StatusCode::NOT_FOUND, body), "Not Found");
    }

    #[test]
    fn test_message_includes_validation_details() {
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"OauthAccess","field":"scopes","code":"invalid"}]}"#;
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "Validation Failed (scopes invalid)"
        );
    }

    #[test]
    fn test_message_falls_back_to_reason() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>proxy</html>"),
            "<html>proxy</html>"
        );
    }

    #[test]
    fn test_classify_response() {
        let err = classify_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"Validation Failed"}"#,
        );
        assert!(err.is_scopes_rejected());
        assert!(classify_response(StatusCode::NOT_FOUND, "").is_not_found());
    }
}
