use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One answer per (session, question). Autosave upserts by question id; the
/// last write wins and no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionAnswer {
    pub id: Uuid,
    pub test_session_id: Uuid,
    pub question_id: String,
    pub answer: JsonValue,
    pub is_correct: Option<bool>,
    pub points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
