use anyhow::{anyhow, Context, Result};
use axum::http::HeaderValue;
use secrecy::SecretString;
use tracing::warn;
use url::Url;

use crate::api::{
    gate::{AccessGate, GatePolicy},
    token::SessionTokens,
    ApiConfig, OwnershipMode,
};

/// Process-wide settings resolved from flags and `COMICFORGE_*` variables.
#[derive(Clone)]
pub struct GlobalArgs {
    pub gate_policy: GatePolicy,
    pub token_secret: Option<SecretString>,
    pub strict_ownership: bool,
    pub allowed_origin: Option<String>,
    pub max_connections: u32,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            gate_policy: GatePolicy::default(),
            token_secret: None,
            strict_ownership: false,
            allowed_origin: None,
            max_connections: 5,
        }
    }
}

impl GlobalArgs {
    /// Reject combinations that cannot serve requests.
    ///
    /// # Errors
    /// Returns an error when the token policy has no secret to verify with.
    pub fn validate(&self) -> Result<()> {
        if self.gate_policy == GatePolicy::Token && self.token_secret.is_none() {
            return Err(anyhow!(
                "missing required argument: --token-secret (required with --gate-policy token)"
            ));
        }
        Ok(())
    }

    /// Build the request-path configuration shared by every handler.
    ///
    /// # Errors
    /// Returns an error if the settings are inconsistent or the allowed origin is not a URL.
    pub fn api_config(&self) -> Result<ApiConfig> {
        self.validate()?;

        let tokens = if let Some(secret) = &self.token_secret {
            SessionTokens::new(secret.clone())
        } else {
            warn!("No token secret configured; issued tokens will not survive a restart");
            SessionTokens::ephemeral()
        };

        let allowed_origin = self
            .allowed_origin
            .as_deref()
            .map(origin_header)
            .transpose()?;

        Ok(ApiConfig {
            gate: AccessGate::new(self.gate_policy, tokens),
            ownership: OwnershipMode::from_strict(self.strict_ownership),
            allowed_origin,
        })
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("gate_policy", &self.gate_policy)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "***"))
            .field("strict_ownership", &self.strict_ownership)
            .field("allowed_origin", &self.allowed_origin)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Reduce a URL to the `scheme://host[:port]` form browsers send in `Origin`.
fn origin_header(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid allowed origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Allowed origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build allowed origin header")
}
