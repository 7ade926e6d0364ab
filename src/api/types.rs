//! Request/response payloads for the auth and data endpoints.
//!
//! These are shared between handlers, storage and `OpenAPI` generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthQuery {
    /// `profile` selects the profile operations on `GET`/`PUT`.
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AuthRequest {
    /// `register` or `login`.
    pub action: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub comics_count: i64,
    pub characters_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserBody {
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileBody {
    pub user: ProfileResponse,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataQuery {
    /// `comics` or `characters`.
    pub entity: Option<String>,
    /// `true` lists archived comics; anything else lists active ones.
    pub archived: Option<String>,
}

impl DataQuery {
    #[must_use]
    pub fn wants_archived(&self) -> bool {
        self.archived.as_deref() == Some("true")
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateComicRequest {
    pub title: Option<String>,
    pub prompt: Option<String>,
    pub style: Option<String>,
    /// Stored as given. Usually image URLs in order, with `null` for a panel
    /// that failed to generate.
    #[schema(value_type = Object)]
    pub panels: Option<Value>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateComicRequest {
    pub id: Option<i64>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComicResponse {
    pub id: i64,
    pub title: String,
    pub prompt: String,
    pub style: String,
    #[schema(value_type = Object)]
    pub panels: Value,
    pub status: String,
    pub is_archived: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComicsBody {
    pub comics: Vec<ComicResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedComic {
    pub id: i64,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CharacterRequest {
    /// `create` (default) or `remove`.
    pub action: Option<String>,
    /// Required for `remove`.
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CharacterResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub style: String,
    pub color: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CharacterBody {
    pub character: CharacterResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CharactersBody {
    pub characters: Vec<CharacterResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
