//! Character rows scoped to their owner, with palette assignment.

use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::{db_span, Lifecycle};
use crate::api::{error::ApiError, types::CharacterResponse};

/// Card colors handed out in creation order, cycling per owner.
pub const COLOR_PRESETS: [&str; 6] = [
    "from-purple-500 to-cyan-400",
    "from-pink-500 to-rose-400",
    "from-blue-500 to-indigo-400",
    "from-green-500 to-emerald-400",
    "from-orange-500 to-yellow-400",
    "from-red-500 to-pink-400",
];

/// Color for the next character given how many active ones the owner already has.
#[must_use]
pub fn color_for(existing: i64) -> &'static str {
    let len = COLOR_PRESETS.len() as i64;
    let index = usize::try_from(existing.rem_euclid(len)).unwrap_or(0);
    COLOR_PRESETS[index]
}

/// Fields for a new character after validation.
#[derive(Debug)]
pub struct NewCharacter<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub style: &'a str,
}

/// Lists the owner's active characters, newest first.
pub async fn list_characters(
    pool: &PgPool,
    owner_id: i64,
) -> Result<Vec<CharacterResponse>, ApiError> {
    let query = r#"
        SELECT id, name, description, style, color,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM characters
        WHERE owner_id = $1 AND lifecycle = $2
        ORDER BY characters.created_at DESC, characters.id DESC
    "#;

    let rows = sqlx::query(query)
        .bind(owner_id)
        .bind(Lifecycle::Active.as_str())
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await?;

    rows.iter().map(character_from_row).collect()
}

/// Inserts a character and assigns its color from the owner's active count.
///
/// The owner row is locked for the duration of the transaction so concurrent
/// creations for the same owner see distinct counts. Returns `NotFound` when
/// the owner does not exist.
pub async fn insert_character(
    pool: &PgPool,
    owner_id: i64,
    character: &NewCharacter<'_>,
) -> Result<CharacterResponse, ApiError> {
    let mut tx = pool.begin().await?;

    let lock = "SELECT id FROM users WHERE id = $1 FOR UPDATE";
    let owner = sqlx::query(lock)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .instrument(db_span("SELECT", lock))
        .await?;
    if owner.is_none() {
        // dropping the transaction rolls it back
        return Err(ApiError::NotFound("User not found"));
    }

    let count = "SELECT COUNT(*) AS existing FROM characters WHERE owner_id = $1 AND lifecycle = $2";
    let existing: i64 = sqlx::query(count)
        .bind(owner_id)
        .bind(Lifecycle::Active.as_str())
        .fetch_one(&mut *tx)
        .instrument(db_span("SELECT", count))
        .await?
        .try_get("existing")?;

    let insert = r#"
        INSERT INTO characters (owner_id, name, description, style, color)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, description, style, color,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let row = sqlx::query(insert)
        .bind(owner_id)
        .bind(character.name)
        .bind(character.description)
        .bind(character.style)
        .bind(color_for(existing))
        .fetch_one(&mut *tx)
        .instrument(db_span("INSERT", insert))
        .await?;

    tx.commit().await?;

    character_from_row(&row)
}

/// Marks a character `removed`. Returns the number of rows matched, which is
/// zero when the character is missing, already removed, or someone else's.
pub async fn remove_character(
    pool: &PgPool,
    owner_id: i64,
    character_id: i64,
) -> Result<u64, ApiError> {
    let query = r"
        UPDATE characters
        SET lifecycle = $1
        WHERE id = $2 AND owner_id = $3 AND lifecycle = $4
    ";

    let result = sqlx::query(query)
        .bind(Lifecycle::Removed.as_str())
        .bind(character_id)
        .bind(owner_id)
        .bind(Lifecycle::Active.as_str())
        .execute(pool)
        .instrument(db_span("UPDATE", query))
        .await?;

    Ok(result.rows_affected())
}

fn character_from_row(row: &PgRow) -> Result<CharacterResponse, ApiError> {
    Ok(CharacterResponse {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        style: row.try_get("style")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_cycle_in_creation_order() {
        let assigned: Vec<&str> = (0..14).map(color_for).collect();
        for (index, color) in assigned.iter().enumerate() {
            assert_eq!(*color, COLOR_PRESETS[index % COLOR_PRESETS.len()]);
        }
        assert_eq!(assigned[0], "from-purple-500 to-cyan-400");
        assert_eq!(assigned[6], "from-purple-500 to-cyan-400");
        assert_eq!(assigned[13], "from-pink-500 to-rose-400");
    }

    #[test]
    fn negative_counts_stay_in_range() {
        assert!(COLOR_PRESETS.contains(&color_for(-1)));
    }
}
