use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::get,
    Extension, Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod credentials;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod storage;
pub mod token;
pub mod types;
// OpenAPI document assembly lives in openapi.rs.
mod openapi;

pub use openapi::openapi;

use self::{
    gate::{AccessGate, USER_ID_HEADER},
    handlers::{auth, data, health, method_not_allowed, preflight, root},
};

/// Preflight responses may be cached for a day.
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// What an owner-scoped mutation reports when it matches no rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OwnershipMode {
    /// `200 {"ok": true}` whether or not a row changed.
    #[default]
    Lenient,
    /// `404` when the row is missing, removed, or owned by someone else.
    Strict,
}

impl OwnershipMode {
    #[must_use]
    pub const fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Request-path configuration, built once at start and shared by every handler.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub gate: AccessGate,
    pub ownership: OwnershipMode,
    /// `None` allows any origin.
    pub allowed_origin: Option<HeaderValue>,
}

/// Build the application router with its middleware stack.
///
/// The pool is only touched by handlers that get past validation and the access
/// gate, so a lazily connected pool is enough to exercise everything else.
pub fn router(pool: PgPool, config: Arc<ApiConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, USER_ID_HEADER])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_origin(
            config
                .allowed_origin
                .clone()
                .map_or_else(AllowOrigin::any, AllowOrigin::exact),
        )
        .max_age(CORS_MAX_AGE);

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/openapi.json", get(openapi_json))
        .route(
            "/auth",
            get(auth::get_auth)
                .post(auth::post_auth)
                .put(auth::put_auth)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/data",
            get(data::get_data)
                .post(data::post_data)
                .put(data::put_data)
                .options(preflight)
                .fallback(data::data_fallback),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(config))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    let config = Arc::new(globals.api_config()?);

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(globals.max_connections)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    info!(
        gate_policy = %config.gate.policy(),
        ownership = ?config.ownership,
        "API configured"
    );

    let app = router(pool, config);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(openapi())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
