use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::SessionAnswer;
use crate::models::assignment::TestAssignment;
use crate::models::participant::Participant;
use crate::models::session::{SessionMetadata, SessionStatus, TestSession};
use crate::models::test::Test;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartParticipantSessionRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartPublicSessionRequest {
    pub public_user_id: Uuid,
    pub test_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveAnswersRequest {
    #[validate(length(min = 1))]
    pub answers: HashMap<String, JsonValue>,
}

/// Session as exposed over HTTP: the token is the handle, the internal id is
/// never the addressing key for clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_token: String,
    pub status: SessionStatus,
    pub test_id: Uuid,
    pub test_assignment_id: Option<Uuid>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub time_spent_seconds: i32,
    pub metadata: SessionMetadata,
}

impl From<TestSession> for SessionView {
    fn from(session: TestSession) -> Self {
        Self {
            session_token: session.session_token,
            status: session.status,
            test_id: session.test_id,
            test_assignment_id: session.test_assignment_id,
            started_at: session.started_at,
            completed_at: session.completed_at,
            time_spent_seconds: session.time_spent_seconds,
            metadata: session.metadata.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSessionResponse {
    pub session: SessionView,
    pub test: TestSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetailResponse {
    pub session: SessionView,
    pub answers: Vec<AnswerView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    pub question_id: String,
    pub answer: JsonValue,
    pub points: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<SessionAnswer> for AnswerView {
    fn from(answer: SessionAnswer) -> Self {
        Self {
            question_id: answer.question_id,
            answer: answer.answer,
            points: answer.points,
            updated_at: answer.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatResponse {
    pub time_spent_seconds: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentInfoResponse {
    pub assignment: AssignmentView,
    pub test: TestSummary,
    pub participant: ParticipantSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    pub token: String,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub is_completed: bool,
}

impl From<TestAssignment> for AssignmentView {
    fn from(assignment: TestAssignment) -> Self {
        Self {
            token: assignment.unique_token,
            start_date: assignment.start_date,
            end_date: assignment.end_date,
            is_completed: assignment.is_completed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub question_count: i32,
}

impl From<Test> for TestSummary {
    fn from(test: Test) -> Self {
        Self {
            name: test.name,
            code: test.code,
            description: test.description,
            duration_minutes: test.duration_minutes,
            question_count: test.question_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoView {
    pub id: Uuid,
    pub captured_at: chrono::DateTime<chrono::Utc>,
    pub metadata: JsonValue,
}

impl From<crate::models::photo::TestSessionPhoto> for PhotoView {
    fn from(photo: crate::models::photo::TestSessionPhoto) -> Self {
        Self {
            id: photo.id,
            captured_at: photo.captured_at,
            metadata: photo.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSummary {
    pub name: String,
    pub email: String,
}

impl From<Participant> for ParticipantSummary {
    fn from(participant: Participant) -> Self {
        Self {
            name: participant.name,
            email: participant.email,
        }
    }
}
