//! Session tokens handed out at registration and login.
//!
//! Layout: `user_id:nonce:issued_at:tag` where `nonce` is 32 random bytes in hex,
//! `issued_at` is Unix seconds and `tag` is HMAC-SHA256 over the first three
//! fields. Tokens are not stored server side and do not expire.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Nonce byte length before hex encoding (32 bytes = 64 hex chars).
const NONCE_BYTES: usize = 32;

/// Generated key length when no secret is configured.
const EPHEMERAL_KEY_BYTES: usize = 32;

const DELIMITER: char = ':';

/// Fields recovered from a verified token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: i64,
    pub issued_at: u64,
}

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct SessionTokens {
    key: SecretString,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens").finish_non_exhaustive()
    }
}

impl SessionTokens {
    #[must_use]
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    /// Build an issuer with a random key that only lives as long as the process.
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut key = [0u8; EPHEMERAL_KEY_BYTES];
        OsRng.fill_bytes(&mut key);
        Self::new(SecretString::from(hex::encode(key)))
    }

    /// Issue a token for `user_id` stamped with the current time.
    ///
    /// # Errors
    /// Returns an error if the signing key cannot initialise the MAC.
    pub fn issue(&self, user_id: i64) -> Result<String> {
        self.issue_at(user_id, now_unix_seconds())
    }

    fn issue_at(&self, user_id: i64, issued_at: u64) -> Result<String> {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);

        let payload = format!(
            "{user_id}{DELIMITER}{}{DELIMITER}{issued_at}",
            hex::encode(nonce)
        );
        let mac = self
            .mac(&payload)
            .ok_or_else(|| anyhow!("invalid session token key"))?;
        let tag = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{payload}{DELIMITER}{tag}"))
    }

    /// Verify the token signature and return its claims.
    ///
    /// Returns `None` for malformed tokens or a tag that does not match this key.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let (payload, tag) = token.trim().rsplit_once(DELIMITER)?;
        let tag = hex::decode(tag).ok()?;

        let mut fields = payload.split(DELIMITER);
        let user_id = fields.next()?.parse::<i64>().ok()?;
        let nonce = fields.next()?;
        let issued_at = fields.next()?.parse::<u64>().ok()?;
        if fields.next().is_some() || nonce.len() != NONCE_BYTES * 2 {
            return None;
        }

        // verify_slice compares in constant time
        self.mac(payload)?.verify_slice(&tag).ok()?;

        Some(TokenClaims { user_id, issued_at })
    }

    fn mac(&self, payload: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes()).ok()?;
        mac.update(payload.as_bytes());
        Some(mac)
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens::new(SecretString::from("test-signing-key"))
    }

    #[test]
    fn issued_token_layout() -> Result<()> {
        let token = tokens().issue_at(42, 1_700_000_000)?;
        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "42");
        assert_eq!(parts[1].len(), 64);
        assert_eq!(parts[2], "1700000000");
        assert_eq!(parts[3].len(), 64);
        Ok(())
    }

    #[test]
    fn verify_round_trip() -> Result<()> {
        let tokens = tokens();
        let token = tokens.issue_at(7, 1_700_000_123)?;
        assert_eq!(
            tokens.verify(&token),
            Some(TokenClaims {
                user_id: 7,
                issued_at: 1_700_000_123
            })
        );
        Ok(())
    }

    #[test]
    fn nonces_differ_between_tokens() -> Result<()> {
        let tokens = tokens();
        assert_ne!(tokens.issue(1)?, tokens.issue(1)?);
        Ok(())
    }

    #[test]
    fn tampered_user_id_is_rejected() -> Result<()> {
        let tokens = tokens();
        let token = tokens.issue_at(7, 1_700_000_000)?;
        let forged = format!("8{}", &token[1..]);
        assert_eq!(tokens.verify(&forged), None);
        Ok(())
    }

    #[test]
    fn other_key_is_rejected() -> Result<()> {
        let token = tokens().issue(7)?;
        let other = SessionTokens::new(SecretString::from("another-key"));
        assert_eq!(other.verify(&token), None);
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = tokens();
        assert_eq!(tokens.verify(""), None);
        assert_eq!(tokens.verify("7"), None);
        assert_eq!(tokens.verify("7:abc:1:zz"), None);
        assert_eq!(tokens.verify("x:y:z:00"), None);
    }

    #[test]
    fn ephemeral_keys_are_distinct() -> Result<()> {
        let token = SessionTokens::ephemeral().issue(3)?;
        assert_eq!(SessionTokens::ephemeral().verify(&token), None);
        Ok(())
    }
}
