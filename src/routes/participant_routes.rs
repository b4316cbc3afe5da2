use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::envelope::ApiResponse;
use crate::dto::session_dto::{
    AssignmentInfoResponse, AssignmentView, ParticipantSummary, TestSummary,
};
use crate::AppState;

#[axum::debug_handler]
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let (assignment, participant) = state.assignment_service.validate_token(&token).await?;
    let test = state.session_service.get_test(assignment.test_id).await?;

    let response = AssignmentInfoResponse {
        assignment: AssignmentView::from(assignment),
        test: TestSummary::from(test),
        participant: ParticipantSummary::from(participant),
    };
    Ok(Json(ApiResponse::ok(response, "Assignment retrieved successfully")).into_response())
}
