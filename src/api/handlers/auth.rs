//! Registration, login and the caller's own profile.
//!
//! `POST /auth` dispatches on the body `action`; `GET`/`PUT /auth?action=profile`
//! read and rename the caller's account. Login returns the same error for an
//! unknown email and a wrong password.

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, instrument};

use super::{non_blank, parse_body, valid_email, MIN_PASSWORD_LEN};
use crate::api::{
    credentials::{dummy_verify, hash_password, verify_password},
    error::ApiError,
    storage::users,
    types::{
        AuthQuery, AuthRequest, AuthResponse, ErrorResponse, ProfileBody, UpdateProfileRequest,
        UserBody, UserResponse,
    },
    ApiConfig,
};

const PROFILE_ACTION: &str = "profile";

#[utoipa::path(
    get,
    path = "/auth",
    params(AuthQuery),
    responses(
        (status = 200, description = "Caller's account with active comic and character counts", body = ProfileBody),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 404, description = "Account does not exist", body = ErrorResponse),
        (status = 405, description = "Missing or unknown action", body = ErrorResponse),
    ),
    security(("user_id" = []), ("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(pool, config, headers))]
pub async fn get_auth(
    pool: Extension<PgPool>,
    config: Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    Query(query): Query<AuthQuery>,
) -> Result<Json<ProfileBody>, ApiError> {
    if query.action.as_deref() != Some(PROFILE_ACTION) {
        return Err(ApiError::MethodNotSupported);
    }

    let caller = config.gate.resolve_identity(&headers)?;

    let profile = users::fetch_profile(&pool, caller.user_id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(ProfileBody { user: profile }))
}

#[utoipa::path(
    post,
    path = "/auth",
    request_body = AuthRequest,
    responses(
        (status = 201, description = "Account created (action=register)", body = AuthResponse),
        (status = 200, description = "Logged in (action=login)", body = AuthResponse),
        (status = 400, description = "Missing fields, invalid email, short password or unknown action", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(pool, config, body))]
pub async fn post_auth(
    pool: Extension<PgPool>,
    config: Extension<Arc<ApiConfig>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: AuthRequest = parse_body(&body)?;

    let email = request.email.trim().to_lowercase();
    let password = request.password.trim().to_string();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Email and password are required"));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation("Password must be at least 6 characters"));
    }

    match request.action.as_str() {
        "register" => {
            if !valid_email(&email) {
                return Err(ApiError::Validation("Invalid email"));
            }
            let name = non_blank(request.name.as_deref())
                .map_or_else(|| local_part(&email).to_string(), str::to_string);
            let response = register(&pool, &config, &email, &name, password).await?;
            Ok((StatusCode::CREATED, Json(response)).into_response())
        }
        "login" => {
            let response = login(&pool, &config, &email, password).await?;
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        _ => Err(ApiError::Validation("action: register or login")),
    }
}

#[utoipa::path(
    put,
    path = "/auth",
    params(AuthQuery),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Display name updated", body = UserBody),
        (status = 400, description = "Blank name or invalid JSON", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 404, description = "Account does not exist", body = ErrorResponse),
        (status = 405, description = "Missing or unknown action", body = ErrorResponse),
    ),
    security(("user_id" = []), ("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(pool, config, headers, body))]
pub async fn put_auth(
    pool: Extension<PgPool>,
    config: Extension<Arc<ApiConfig>>,
    headers: HeaderMap,
    Query(query): Query<AuthQuery>,
    body: Bytes,
) -> Result<Json<UserBody>, ApiError> {
    if query.action.as_deref() != Some(PROFILE_ACTION) {
        return Err(ApiError::MethodNotSupported);
    }

    let caller = config.gate.resolve_identity(&headers)?;

    let request: UpdateProfileRequest = parse_body(&body)?;
    let name = non_blank(request.name.as_deref()).ok_or(ApiError::Validation("Name required"))?;

    let user = users::update_name(&pool, caller.user_id, name)
        .await?
        .ok_or(ApiError::NotFound("Not found"))?;

    Ok(Json(UserBody { user }))
}

async fn register(
    pool: &PgPool,
    config: &ApiConfig,
    email: &str,
    name: &str,
    password: String,
) -> Result<AuthResponse, ApiError> {
    let secret = task::spawn_blocking(move || hash_password(&password, None))
        .await
        .map_err(|err| {
            debug!("Password hashing task failed: {err}");
            ApiError::Internal("Error hashing password")
        })?;

    let user = users::insert_user(pool, email, name, &secret).await?;

    info!(user_id = user.id, "User registered");

    issue(config, user)
}

async fn login(
    pool: &PgPool,
    config: &ApiConfig,
    email: &str,
    password: String,
) -> Result<AuthResponse, ApiError> {
    let credentials = users::find_credentials(pool, email).await?;

    let (user, verified) = task::spawn_blocking(move || match credentials {
        Some(credentials) => {
            let verified = verify_password(&password, &credentials.credential_secret);
            (Some(credentials.user), verified)
        }
        None => {
            dummy_verify(&password);
            (None, false)
        }
    })
    .await
    .map_err(|err| {
        debug!("Password verification task failed: {err}");
        ApiError::Internal("Error verifying password")
    })?;

    match user {
        Some(user) if verified => {
            debug!(user_id = user.id, "Login succeeded");
            issue(config, user)
        }
        _ => Err(ApiError::InvalidCredentials),
    }
}

fn issue(config: &ApiConfig, user: UserResponse) -> Result<AuthResponse, ApiError> {
    let token = config.gate.tokens().issue(user.id).map_err(|err| {
        debug!("Token issuance failed: {err}");
        ApiError::Internal("Error issuing token")
    })?;

    Ok(AuthResponse { token, user })
}

/// Default display name: everything before the `@`.
fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_part() {
        assert_eq!(local_part("a@x.com"), "a");
        assert_eq!(local_part("first.last@example.org"), "first.last");
        assert_eq!(local_part("no-at-sign"), "no-at-sign");
    }
}
