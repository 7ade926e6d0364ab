//! Owner-scoped comics and characters under `/data?entity=...`.
//!
//! Every request resolves the caller first; the entity selector and payload are
//! only looked at afterwards, so an anonymous caller always gets `401`.

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{non_blank, parse_body};
use crate::api::{
    error::ApiError,
    gate::Caller,
    storage::{
        characters::{self, NewCharacter},
        comics::{self, NewComic},
        Lifecycle,
    },
    types::{
        CharacterBody, CharacterRequest, CharacterResponse, CharactersBody, ComicsBody,
        CreateComicRequest, CreatedComic, DataQuery, ErrorResponse, OkResponse,
        UpdateComicRequest,
    },
    ApiConfig, OwnershipMode,
};

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_STYLE: &str = "Manga";
const DEFAULT_STATUS: &str = "completed";

/// Resource selected by the `entity` query parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entity {
    Comics,
    Characters,
}

impl Entity {
    fn from_query(query: &DataQuery) -> Result<Self, ApiError> {
        match query.entity.as_deref() {
            Some("comics") => Ok(Self::Comics),
            Some("characters") => Ok(Self::Characters),
            _ => Err(ApiError::Validation("entity: comics or characters")),
        }
    }
}

/// Gate, then entity. Shared by every `/data` method.
fn admit(
    config: &ApiConfig,
    headers: &HeaderMap,
    query: &DataQuery,
) -> Result<(Caller, Entity), ApiError> {
    let caller = config.gate.resolve_identity(headers)?;
    let entity = Entity::from_query(query)?;
    Ok((caller, entity))
}

#[utoipa::path(
    get,
    path = "/data",
    params(DataQuery),
    responses(
        (status = 200, description = "Comics in the requested archive state, newest first; entity=characters returns CharactersBody", body = ComicsBody),
        (status = 400, description = "Unknown entity", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
    ),
    security(("user_id" = []), ("bearer" = [])),
    tag = "data"
)]
#[instrument(skip(pool, config, headers))]
pub async fn get_data(
    pool: Extension<PgPool>,
    config: Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    Query(query): Query<DataQuery>,
) -> Result<Response, ApiError> {
    let (caller, entity) = admit(&config, &headers, &query)?;

    match entity {
        Entity::Comics => {
            let lifecycle = Lifecycle::from_archived(query.wants_archived());
            let comics = comics::list_comics(&pool, caller.user_id, lifecycle).await?;
            Ok(Json(ComicsBody { comics }).into_response())
        }
        Entity::Characters => {
            let characters = characters::list_characters(&pool, caller.user_id).await?;
            Ok(Json(CharactersBody { characters }).into_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/data",
    params(DataQuery),
    request_body(content = CharacterRequest, description = "entity=comics takes a CreateComicRequest instead"),
    responses(
        (status = 201, description = "Character created; entity=comics returns CreatedComic", body = CharacterBody),
        (status = 200, description = "Character removed (action=remove)", body = OkResponse),
        (status = 400, description = "Unknown entity, blank name, missing id or invalid JSON", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 404, description = "Caller account does not exist, or strict ownership and no matching character", body = ErrorResponse),
    ),
    security(("user_id" = []), ("bearer" = [])),
    tag = "data"
)]
#[instrument(skip(pool, config, headers, body))]
pub async fn post_data(
    pool: Extension<PgPool>,
    config: Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    Query(query): Query<DataQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (caller, entity) = admit(&config, &headers, &query)?;

    match entity {
        Entity::Comics => {
            let request: CreateComicRequest = parse_body(&body)?;
            let created = create_comic(&pool, caller, &request).await?;
            Ok((StatusCode::CREATED, Json(created)).into_response())
        }
        Entity::Characters => {
            let request: CharacterRequest = parse_body(&body)?;
            match request.action.as_deref().unwrap_or("create") {
                "remove" => {
                    let id = request
                        .id
                        .filter(|id| *id != 0)
                        .ok_or(ApiError::Validation("id required"))?;
                    let removed = characters::remove_character(&pool, caller.user_id, id).await?;
                    debug!(character_id = id, removed, "Character remove");
                    acknowledge(config.ownership, removed, "Character not found")
                }
                _ => {
                    let character = create_character(&pool, caller, &request).await?;
                    Ok((StatusCode::CREATED, Json(CharacterBody { character })).into_response())
                }
            }
        }
    }
}

#[utoipa::path(
    put,
    path = "/data",
    params(DataQuery),
    request_body = UpdateComicRequest,
    responses(
        (status = 200, description = "Archive flag applied", body = OkResponse),
        (status = 400, description = "Unknown entity, missing id, nothing to update or invalid JSON", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 404, description = "Strict ownership and no matching comic", body = ErrorResponse),
        (status = 405, description = "entity=characters has no PUT", body = ErrorResponse),
    ),
    security(("user_id" = []), ("bearer" = [])),
    tag = "data"
)]
#[instrument(skip(pool, config, headers, body))]
pub async fn put_data(
    pool: Extension<PgPool>,
    config: Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    Query(query): Query<DataQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (caller, entity) = admit(&config, &headers, &query)?;

    if entity != Entity::Comics {
        return Err(ApiError::MethodNotSupported);
    }

    let request: UpdateComicRequest = parse_body(&body)?;
    let id = request
        .id
        .filter(|id| *id != 0)
        .ok_or(ApiError::Validation("id required"))?;
    let archived = request.is_archived.ok_or(ApiError::Validation("Nothing to update"))?;

    let updated = comics::set_archived(&pool, caller.user_id, id, archived).await?;
    debug!(comic_id = id, archived, updated, "Comic archive flag");

    acknowledge(config.ownership, updated, "Comic not found")
}

/// Any other method on `/data`. Still gated so it never reveals more than a `401`.
pub async fn data_fallback(
    config: Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    Query(query): Query<DataQuery>,
) -> ApiError {
    match admit(&config, &headers, &query) {
        Ok(_) => ApiError::MethodNotSupported,
        Err(err) => err,
    }
}

async fn create_comic(
    pool: &PgPool,
    caller: Caller,
    request: &CreateComicRequest,
) -> Result<CreatedComic, ApiError> {
    let no_panels = Value::Array(Vec::new());
    let comic = NewComic {
        title: request.title.as_deref().unwrap_or(DEFAULT_TITLE),
        prompt: request.prompt.as_deref().unwrap_or_default(),
        style: request.style.as_deref().unwrap_or(DEFAULT_STYLE),
        panels: request.panels.as_ref().unwrap_or(&no_panels),
        status: request.status.as_deref().unwrap_or(DEFAULT_STATUS),
    };

    let created = comics::insert_comic(pool, caller.user_id, &comic).await?;

    info!(comic_id = created.id, owner_id = caller.user_id, "Comic created");

    Ok(created)
}

async fn create_character(
    pool: &PgPool,
    caller: Caller,
    request: &CharacterRequest,
) -> Result<CharacterResponse, ApiError> {
    let name = non_blank(request.name.as_deref()).ok_or(ApiError::Validation("Name required"))?;

    let character = NewCharacter {
        name,
        description: request.description.as_deref().unwrap_or_default(),
        style: request.style.as_deref().unwrap_or_default(),
    };

    let created = characters::insert_character(pool, caller.user_id, &character).await?;

    info!(
        character_id = created.id,
        owner_id = caller.user_id,
        color = created.color.as_str(),
        "Character created"
    );

    Ok(created)
}

/// Reply to an owner-scoped mutation that matched `affected` rows.
fn acknowledge(
    mode: OwnershipMode,
    affected: u64,
    missing: &'static str,
) -> Result<Response, ApiError> {
    if affected == 0 && mode == OwnershipMode::Strict {
        return Err(ApiError::NotFound(missing));
    }

    Ok(Json(OkResponse { ok: true }).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(entity: Option<&str>) -> DataQuery {
        DataQuery {
            entity: entity.map(str::to_string),
            archived: None,
        }
    }

    #[test]
    fn entity_selector() {
        assert!(matches!(
            Entity::from_query(&query(Some("comics"))),
            Ok(Entity::Comics)
        ));
        assert!(matches!(
            Entity::from_query(&query(Some("characters"))),
            Ok(Entity::Characters)
        ));
        assert!(matches!(
            Entity::from_query(&query(Some("Comics"))),
            Err(ApiError::Validation("entity: comics or characters"))
        ));
        assert!(Entity::from_query(&query(None)).is_err());
    }

    #[test]
    fn comic_panels_accept_any_json() -> Result<(), ApiError> {
        let request: CreateComicRequest =
            parse_body(br#"{"title":"T","panels":[{"url":"u"},3,null,"plain"]}"#)?;
        assert_eq!(
            request.panels,
            Some(serde_json::json!([{"url": "u"}, 3, null, "plain"]))
        );

        let request: CreateComicRequest = parse_body(br#"{"panels":{"layout":"grid"}}"#)?;
        assert!(request.panels.is_some_and(|panels| panels.is_object()));

        let request: CreateComicRequest = parse_body(b"{}")?;
        assert!(request.panels.is_none());
        Ok(())
    }

    #[test]
    fn lenient_mode_acknowledges_zero_rows() {
        let response = acknowledge(OwnershipMode::Lenient, 0, "Comic not found");
        assert!(matches!(response, Ok(ref response) if response.status() == StatusCode::OK));
    }

    #[test]
    fn strict_mode_reports_zero_rows() {
        let response = acknowledge(OwnershipMode::Strict, 0, "Comic not found");
        assert!(matches!(response, Err(ApiError::NotFound("Comic not found"))));

        let response = acknowledge(OwnershipMode::Strict, 1, "Comic not found");
        assert!(response.is_ok());
    }
}
