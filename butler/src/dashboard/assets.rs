//! Front-end page and image files.

use super::{error_response, DashboardState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{error, warn};

const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";

/// Content type from the file extension.
pub(crate) fn image_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// A bare file name: no separators, no parent references.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains(['/', '\\', '\0'])
        && filename != "."
        && !filename.contains("..")
}

pub(super) async fn index(State(state): State<Arc<DashboardState>>) -> Response {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read index.html");
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}

pub(super) async fn image(
    State(state): State<Arc<DashboardState>>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        warn!(filename = %filename, "Rejected image path");
        return error_response(StatusCode::BAD_REQUEST, "Invalid image name", None);
    }

    let path = state.image_dir.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, image_content_type(&filename)),
                (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, "Image not found", None)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read image");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read image",
                Some(e.to_string()),
            )
        }
    }
}
