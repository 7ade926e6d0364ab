use axum::response::IntoResponse;

/// Plain-text banner with the package name and version.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
