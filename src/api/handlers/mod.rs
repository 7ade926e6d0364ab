//! HTTP handlers and shared input checks.
//!
//! `/auth` and `/data` select the operation from the method plus an `action` or
//! `entity` selector, so each path gets a JSON `405` fallback for anything else.

pub mod auth;
pub mod data;
pub mod health;
pub mod root;

use axum::http::StatusCode;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;

/// Passwords shorter than this are rejected at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Lightweight email sanity check used by auth handlers before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Fallback for methods a path does not serve.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotSupported
}

/// Bare `OPTIONS` without preflight headers. Real preflights are answered by the
/// CORS layer before reaching the router.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Parses a JSON request body.
///
/// An empty body yields `T::default()`, so every field takes its default;
/// anything that is not valid JSON for `T` is `400 Invalid JSON`.
pub(crate) fn parse_body<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|err| {
        debug!("Rejected payload: {err}");
        ApiError::Validation("Invalid JSON")
    })
}

/// Trims `value`, returning `None` when nothing is left.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("a@x.com"));
        assert!(valid_email("first.last@example.co.uk"));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("not an email"));
        assert!(!valid_email("a b@x.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Neo ")), Some("Neo"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_parse_body() {
        let empty: crate::api::types::AuthRequest = parse_body(b"").unwrap_or_default();
        assert!(empty.email.is_empty());

        let parsed: Result<crate::api::types::AuthRequest, _> =
            parse_body(br#"{"action":"login","email":"a@x.com","password":"secret1"}"#);
        assert!(matches!(parsed, Ok(ref request) if request.action == "login"));

        let invalid: Result<crate::api::types::AuthRequest, _> = parse_body(b"{not json");
        assert!(matches!(invalid, Err(ApiError::Validation("Invalid JSON"))));

        let mismatched: Result<crate::api::types::UpdateComicRequest, _> =
            parse_body(br#"{"id":"seven"}"#);
        assert!(mismatched.is_err());
    }
}
