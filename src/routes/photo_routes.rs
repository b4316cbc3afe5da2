use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::envelope::ApiResponse;
use crate::dto::session_dto::PhotoView;
use crate::error::Error;
use crate::AppState;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[axum::debug_handler]
pub async fn capture_photo(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
    mut multipart: Multipart,
) -> crate::error::Result<Response> {
    let session = state.session_service.get_by_token(&session_token).await?;
    if !session.is_active() {
        return Err(Error::SessionNotActive);
    }

    while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
        if field.name() != Some("photo") {
            continue;
        }

        let filename = field.file_name().unwrap_or("photo").to_string();
        let data = field.bytes().await.map_err(Error::Multipart)?;
        if data.is_empty() {
            return Err(Error::BadRequest("Photo file is empty".to_string()));
        }

        let extension = std::path::Path::new(&filename)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::BadRequest(format!(
                "File type not allowed. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let photo = state
            .photo_service
            .capture(session.id, data, &extension)
            .await?;
        return Ok(Json(ApiResponse::ok(
            PhotoView::from(photo),
            "Photo captured successfully",
        ))
        .into_response());
    }

    Err(Error::BadRequest("Missing photo field".to_string()))
}

#[axum::debug_handler]
pub async fn get_photos(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.get_by_token(&session_token).await?;
    let photos = state.photo_service.list(session.id).await?;
    let views: Vec<PhotoView> = photos.into_iter().map(PhotoView::from).collect();
    Ok(Json(ApiResponse::ok(views, "Photos retrieved successfully")).into_response())
}
