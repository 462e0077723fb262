//! Preview server: serves registered previews over HTTP.
//!
//!   GET /preview/:id  raw image bytes with their stored content type

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, warn};

use crate::preview::PreviewStore;

/// Build the preview router. Merge it at the application root.
pub fn preview_router(store: PreviewStore) -> Router {
    Router::new()
        .route("/preview/:id", get(serve_preview))
        .with_state(store)
}

async fn serve_preview(Path(id): Path<String>, State(store): State<PreviewStore>) -> Response {
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        warn!(id = %id, "Rejected suspicious preview id");
        return (StatusCode::BAD_REQUEST, "Invalid preview id").into_response();
    }

    let Some(entry) = store.get(&id).await else {
        debug!(id = %id, "Preview not found");
        return (StatusCode::NOT_FOUND, "Preview not found").into_response();
    };

    let content_type = HeaderValue::from_str(&entry.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        entry.data,
    )
        .into_response()
}
