//! Caller identity resolution.
//!
//! Flow Overview: read the credential the configured policy trusts, turn it into
//! a user id, and hand a [`Caller`] to the handler. Nothing here touches the
//! database, so unauthenticated requests are rejected before any store access.

use axum::http::{
    header::{HeaderName, AUTHORIZATION},
    HeaderMap,
};
use std::{fmt, str::FromStr};

use super::{error::ApiError, token::SessionTokens};

/// Identity header read under [`GatePolicy::Header`]. Header names are case-insensitive.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

const BEARER_PREFIX: &str = "Bearer ";

/// Which caller-supplied credential the gate accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GatePolicy {
    /// Trust `X-User-Id` as-is. Only safe behind a gateway that authenticates
    /// the caller and sets the header itself.
    #[default]
    Header,
    /// Require `Authorization: Bearer <token>` with a valid signature.
    Token,
}

impl GatePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "token" => Ok(Self::Token),
            other => Err(format!("invalid gate policy: {other} (expected header or token)")),
        }
    }
}

/// Authenticated caller context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

#[derive(Clone, Debug)]
pub struct AccessGate {
    policy: GatePolicy,
    tokens: SessionTokens,
}

impl AccessGate {
    #[must_use]
    pub fn new(policy: GatePolicy, tokens: SessionTokens) -> Self {
        Self { policy, tokens }
    }

    #[must_use]
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Issuer shared with registration and login so issued tokens verify here.
    #[must_use]
    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    /// Resolve the caller from request headers, or return `401`.
    ///
    /// # Errors
    /// Returns [`ApiError::Unauthenticated`] when the credential is missing or invalid.
    pub fn resolve_identity(&self, headers: &HeaderMap) -> Result<Caller, ApiError> {
        let user_id = match self.policy {
            GatePolicy::Header => header_user_id(headers),
            GatePolicy::Token => bearer_token(headers)
                .and_then(|token| self.tokens.verify(token))
                .map(|claims| claims.user_id),
        };

        user_id
            .filter(|id| *id > 0)
            .map(|user_id| Caller { user_id })
            .ok_or(ApiError::Unauthenticated)
    }
}

fn header_user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
