use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::media::{self, MEDIA_URL_PREFIX};
use crate::state::AppState;

pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/media",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(&format!("{}/{{name}}", MEDIA_URL_PREFIX), get(serve))
}

/// Accepts one multipart field named `file` and answers with the
/// reference to attach to a new post.
async fn upload(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if data.is_empty() {
            return Err(AppError::BadRequest("Upload is empty".into()));
        }

        let kind = media::classify(content_type.as_deref(), file_name.as_deref())?;
        let ext = media::extension_for(content_type.as_deref(), file_name.as_deref(), kind);
        let stored = state.media.store(&data, kind, &ext)?;
        tracing::info!(user_id = %current.user.id, url = %stored.url, "media uploaded");

        return Ok((StatusCode::CREATED, Json(stored)).into_response());
    }

    Err(AppError::BadRequest("Missing file field".into()))
}

async fn serve(State(state): State<AppState>, Path(name): Path<String>) -> AppResult<Response> {
    let bytes = state.media.open(&name)?.ok_or(AppError::NotFound)?;
    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        bytes,
    )
        .into_response())
}
