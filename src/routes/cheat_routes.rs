use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::cheat_dto::{DetectionView, LogCheatEventRequest, LogCheatEventResponse};
use crate::error::Error;
use crate::models::detection::CheatDetectionType;
use crate::AppState;

#[axum::debug_handler]
pub async fn log_cheat_event(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
    Json(req): Json<LogCheatEventRequest>,
) -> crate::error::Result<Response> {
    let detection_type: CheatDetectionType = req.detection_type.parse()?;
    let data = req.detection_data.unwrap_or_else(|| serde_json::json!({}));
    let severity = req.severity.unwrap_or(1);

    // Client telemetry is only accepted while the session is running; the
    // engine itself may still log against completed sessions internally.
    let session = state.session_service.get_by_token(&session_token).await?;
    if !session.is_active() {
        return Err(Error::SessionNotActive);
    }

    let (detection, session_status) = state
        .anti_cheat_service
        .log_event(session.id, detection_type, data, severity)
        .await?;

    Ok(Json(crate::dto::envelope::ApiResponse::ok(
        LogCheatEventResponse {
            detection: DetectionView::from(detection),
            session_status,
        },
        "Cheat event logged successfully",
    ))
    .into_response())
}

#[axum::debug_handler]
pub async fn get_detections(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.get_by_token(&session_token).await?;
    let detections = state.anti_cheat_service.get_detections(session.id).await?;

    let views: Vec<DetectionView> = detections.into_iter().map(DetectionView::from).collect();
    Ok(Json(crate::dto::envelope::ApiResponse::ok(
        views,
        "Detections retrieved successfully",
    ))
    .into_response())
}
