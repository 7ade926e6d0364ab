//! # Comicforge (accounts, comics and characters)
//!
//! `comicforge` serves account registration and login plus owner-scoped storage
//! for two resource types: comics and characters.
//!
//! ## Identity
//!
//! Passwords are stored as a single opaque `salt:derived_key` string produced by
//! PBKDF2-HMAC-SHA256. Registration and login hand back an HMAC-signed session
//! token. Which credential the API actually trusts is a deployment choice:
//!
//! - **`header`** (default): the caller's user id is read from `X-User-Id`. This is
//!   a trust boundary and only makes sense behind a gateway that sets the header.
//! - **`token`**: the caller presents `Authorization: Bearer <token>` and the
//!   signature is checked on every request.
//!
//! ## Ownership
//!
//! Every comic and character row carries an `owner_id`; reads and writes are always
//! filtered by the resolved caller. Nothing is physically deleted: rows move through
//! a `lifecycle` column (`active`, `archived`, `removed`).

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
