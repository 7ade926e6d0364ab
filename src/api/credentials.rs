//! Password hashing and verification.
//!
//! A stored credential is one string, `salt:hex(derived_key)`, where the salt is
//! 16 random bytes hex-encoded and the key is PBKDF2-HMAC-SHA256 over the
//! password with the salt's text as input.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

/// Salt byte length before hex encoding.
const SALT_BYTES: usize = 16;

/// Derived key length (SHA-256 output size).
const KEY_BYTES: usize = 32;

/// PBKDF2 rounds; fixed so stored secrets remain verifiable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const SEPARATOR: char = ':';

/// Generate a fresh random hex salt.
#[must_use]
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Hash `password` into a storable secret. A new salt is drawn when `salt` is `None`.
#[must_use]
pub fn hash_password(password: &str, salt: Option<&str>) -> String {
    let salt = salt.map_or_else(generate_salt, str::to_string);
    let key = derive_key(password, &salt);
    format!("{salt}{SEPARATOR}{}", hex::encode(key))
}

/// Check `password` against a secret produced by [`hash_password`].
///
/// Malformed secrets never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, _)) = stored.split_once(SEPARATOR) else {
        return false;
    };
    if salt.is_empty() {
        return false;
    }

    let candidate = hash_password(password, Some(salt));
    constant_time_eq(candidate.as_bytes(), stored.as_bytes())
}

/// Burn the same amount of work as a real verification.
///
/// Login calls this when the email is unknown so both failure paths take equally long.
pub fn dummy_verify(password: &str) {
    let _ = derive_key(password, "00000000000000000000000000000000");
}

fn derive_key(password: &str, salt: &str) -> [u8; KEY_BYTES] {
    let mut key = [0u8; KEY_BYTES];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut key,
    );
    key
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let secret = hash_password("secret1", None);
        assert!(verify_password("secret1", &secret));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let secret = hash_password("secret1", None);
        assert!(!verify_password("secret2", &secret));
        assert!(!verify_password("", &secret));
    }

    #[test]
    fn fresh_salt_per_call() {
        let first = hash_password("same-password", None);
        let second = hash_password("same-password", None);
        assert_ne!(first, second);
        assert!(verify_password("same-password", &first));
        assert!(verify_password("same-password", &second));
    }

    #[test]
    fn supplied_salt_is_deterministic() {
        let salt = "00112233445566778899aabbccddeeff";
        assert_eq!(
            hash_password("hunter22", Some(salt)),
            hash_password("hunter22", Some(salt))
        );
    }

    #[test]
    fn secret_layout() {
        let secret = hash_password("secret1", None);
        let (salt, key) = secret.split_once(':').unwrap_or_default();
        assert_eq!(salt.len(), SALT_BYTES * 2);
        assert_eq!(key.len(), KEY_BYTES * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn malformed_secret_is_rejected() {
        assert!(!verify_password("secret1", ""));
        assert!(!verify_password("secret1", "no-separator"));
        assert!(!verify_password("secret1", ":deadbeef"));
    }

    #[test]
    fn secrets_differing_only_in_key_do_not_match() {
        let salt = "00112233445566778899aabbccddeeff";
        let stored = hash_password("secret1", Some(salt));
        let other = hash_password("secret2", Some(salt));

        assert_eq!(stored.len(), other.len());
        assert!(constant_time_eq(stored.as_bytes(), stored.as_bytes()));
        assert!(!constant_time_eq(stored.as_bytes(), other.as_bytes()));

        // a truncated key must not match its own prefix
        let truncated = &stored[..stored.len() - 2];
        assert!(!constant_time_eq(stored.as_bytes(), truncated.as_bytes()));
        assert!(!verify_password("secret1", truncated));
    }
}
