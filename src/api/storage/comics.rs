//! Comic rows scoped to their owner.

use serde_json::Value;
use sqlx::{types::Json, PgPool, Row};
use tracing::Instrument;

use super::{db_span, Lifecycle};
use crate::api::{
    error::{is_foreign_key_violation, ApiError},
    types::{ComicResponse, CreatedComic},
};

/// Fields for a new comic after defaults have been applied.
#[derive(Debug)]
pub struct NewComic<'a> {
    pub title: &'a str,
    pub prompt: &'a str,
    pub style: &'a str,
    pub panels: &'a Value,
    pub status: &'a str,
}

/// Lists the owner's comics in one lifecycle state, newest first.
pub async fn list_comics(
    pool: &PgPool,
    owner_id: i64,
    lifecycle: Lifecycle,
) -> Result<Vec<ComicResponse>, ApiError> {
    let query = r#"
        SELECT id, title, prompt, style, panels, status,
            lifecycle = 'archived' AS is_archived,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM comics
        WHERE owner_id = $1 AND lifecycle = $2
        ORDER BY comics.created_at DESC, comics.id DESC
    "#;

    let rows = sqlx::query(query)
        .bind(owner_id)
        .bind(lifecycle.as_str())
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await?;

    rows.iter()
        .map(|row| -> Result<ComicResponse, ApiError> {
            let panels: Option<Json<Value>> = row.try_get("panels")?;
            Ok(ComicResponse {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                prompt: row.try_get("prompt")?,
                style: row.try_get("style")?,
                panels: panels.map_or_else(|| Value::Array(Vec::new()), |Json(panels)| panels),
                status: row.try_get("status")?,
                is_archived: row.try_get("is_archived")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Inserts a comic for `owner_id`. Panels go into JSONB untouched.
pub async fn insert_comic(
    pool: &PgPool,
    owner_id: i64,
    comic: &NewComic<'_>,
) -> Result<CreatedComic, ApiError> {
    let query = r#"
        INSERT INTO comics (owner_id, title, prompt, style, panels, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;

    let row = sqlx::query(query)
        .bind(owner_id)
        .bind(comic.title)
        .bind(comic.prompt)
        .bind(comic.style)
        .bind(Json(comic.panels))
        .bind(comic.status)
        .fetch_one(pool)
        .instrument(db_span("INSERT", query))
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                ApiError::NotFound("User not found")
            } else {
                ApiError::Database(err)
            }
        })?;

    Ok(CreatedComic {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Moves a comic between `active` and `archived`. Returns the number of rows
/// matched, which is zero when the comic is missing, removed, or someone else's.
pub async fn set_archived(
    pool: &PgPool,
    owner_id: i64,
    comic_id: i64,
    archived: bool,
) -> Result<u64, ApiError> {
    let query = r"
        UPDATE comics
        SET lifecycle = $1
        WHERE id = $2 AND owner_id = $3 AND lifecycle <> $4
    ";

    let result = sqlx::query(query)
        .bind(Lifecycle::from_archived(archived).as_str())
        .bind(comic_id)
        .bind(owner_id)
        .bind(Lifecycle::Removed.as_str())
        .execute(pool)
        .instrument(db_span("UPDATE", query))
        .await?;

    Ok(result.rows_affected())
}
