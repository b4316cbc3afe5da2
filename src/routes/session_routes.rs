use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::envelope::ApiResponse;
use crate::dto::session_dto::{
    AnswerView, HeartbeatResponse, SaveAnswersRequest, SessionDetailResponse, SessionView,
    StartParticipantSessionRequest, StartPublicSessionRequest, StartSessionResponse, TestSummary,
};
use crate::error::Error;
use crate::models::owner::SessionOwner;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_participant_session(
    State(state): State<AppState>,
    Json(req): Json<StartParticipantSessionRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let (assignment, participant) = state.assignment_service.validate_token(&req.token).await?;
    let test = state.session_service.get_test(assignment.test_id).await?;

    let session = state
        .session_service
        .start(
            SessionOwner::Participant(participant.id),
            &test,
            Some(&assignment),
        )
        .await?;

    Ok(Json(ApiResponse::ok(
        StartSessionResponse {
            session: SessionView::from(session),
            test: TestSummary::from(test),
        },
        "Test session started successfully",
    ))
    .into_response())
}

#[axum::debug_handler]
pub async fn start_public_session(
    State(state): State<AppState>,
    Json(req): Json<StartPublicSessionRequest>,
) -> crate::error::Result<Response> {
    let public_user = state
        .session_service
        .get_public_user(req.public_user_id)
        .await?;
    let test = state.session_service.get_test(req.test_id).await?;
    if !test.is_active {
        return Err(Error::BadRequest("Test is not available".to_string()));
    }

    let session = state
        .session_service
        .start(SessionOwner::PublicUser(public_user.id), &test, None)
        .await?;

    Ok(Json(ApiResponse::ok(
        StartSessionResponse {
            session: SessionView::from(session),
            test: TestSummary::from(test),
        },
        "Test session started successfully",
    ))
    .into_response())
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.get_by_token(&session_token).await?;
    let answers = state.session_service.get_answers(session.id).await?;

    let response = SessionDetailResponse {
        session: SessionView::from(session),
        answers: answers.into_iter().map(AnswerView::from).collect(),
    };
    Ok(Json(ApiResponse::ok(response, "Session retrieved successfully")).into_response())
}

#[axum::debug_handler]
pub async fn save_answers(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
    Json(req): Json<SaveAnswersRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let session = state
        .session_service
        .autosave(&session_token, &req.answers)
        .await?;

    Ok(Json(ApiResponse::ok(
        SessionView::from(session),
        "Answers saved successfully",
    ))
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.submit(&session_token).await?;

    // Timing check runs after the submit commits; a failure here must not
    // undo a successful submission.
    if let Err(e) = state.anti_cheat_service.evaluate_time_anomaly(&session).await {
        tracing::error!(
            session_token = %session.session_token,
            error = ?e,
            "Time anomaly evaluation failed"
        );
    }

    Ok(Json(ApiResponse::ok(
        SessionView::from(session),
        "Test submitted successfully",
    ))
    .into_response())
}

#[axum::debug_handler]
pub async fn update_time(
    State(state): State<AppState>,
    Path(session_token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.heartbeat(&session_token).await?;

    Ok(Json(ApiResponse::ok(
        HeartbeatResponse {
            time_spent_seconds: session.time_spent_seconds,
        },
        "Time updated successfully",
    ))
    .into_response())
}
