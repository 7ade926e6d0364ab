//! Account rows: registration, credential lookup and profile reads/writes.

use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{error, Instrument};

use super::{db_span, Lifecycle};
use crate::api::{
    error::{is_unique_violation, ApiError},
    types::{ProfileResponse, UserResponse},
};

/// Account projection plus the stored credential, used only by login.
#[derive(Debug)]
pub struct Credentials {
    pub user: UserResponse,
    pub credential_secret: String,
}

/// Inserts a new account. The unique index on `lower(email)` is the only
/// duplicate check, so concurrent registrations cannot both succeed.
pub async fn insert_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    credential_secret: &str,
) -> Result<UserResponse, ApiError> {
    let query = r#"
        INSERT INTO users (email, name, credential_secret)
        VALUES ($1, $2, $3)
        RETURNING id, email, name,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;

    let row = sqlx::query(query)
        .bind(email)
        .bind(name)
        .bind(credential_secret)
        .fetch_one(pool)
        .instrument(db_span("INSERT", query))
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ApiError::Conflict("User with this email already exists")
            } else {
                error!("Error inserting user: {err}");
                ApiError::Database(err)
            }
        })?;

    user_from_row(&row)
}

pub async fn find_credentials(pool: &PgPool, email: &str) -> Result<Option<Credentials>, ApiError> {
    let query = r#"
        SELECT id, email, name, credential_secret,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM users
        WHERE lower(email) = lower($1)
    "#;

    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await?;

    row.map(|row| -> Result<Credentials, ApiError> {
        Ok(Credentials {
            user: user_from_row(&row)?,
            credential_secret: row.try_get("credential_secret")?,
        })
    })
    .transpose()
}

/// Fetches the account with counts of its active comics and characters.
pub async fn fetch_profile(pool: &PgPool, user_id: i64) -> Result<Option<ProfileResponse>, ApiError> {
    let query = r#"
        SELECT u.id, u.email, u.name,
            to_char(u.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            (SELECT COUNT(*) FROM comics c
                WHERE c.owner_id = u.id AND c.lifecycle = $2) AS comics_count,
            (SELECT COUNT(*) FROM characters ch
                WHERE ch.owner_id = u.id AND ch.lifecycle = $2) AS characters_count
        FROM users u
        WHERE u.id = $1
    "#;

    let row = sqlx::query(query)
        .bind(user_id)
        .bind(Lifecycle::Active.as_str())
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(ProfileResponse {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        comics_count: row.try_get("comics_count")?,
        characters_count: row.try_get("characters_count")?,
    }))
}

/// Sets the display name. `None` means the account no longer exists.
pub async fn update_name(
    pool: &PgPool,
    user_id: i64,
    name: &str,
) -> Result<Option<UserResponse>, ApiError> {
    let query = r#"
        UPDATE users
        SET name = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, email, name,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;

    let row = sqlx::query(query)
        .bind(name)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(db_span("UPDATE", query))
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

fn user_from_row(row: &PgRow) -> Result<UserResponse, ApiError> {
    Ok(UserResponse {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}
