use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Proctoring photo evidence. Associated to a session by id only; never
/// influences the session state machine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSessionPhoto {
    pub id: Uuid,
    pub test_session_id: Uuid,
    pub photo_path: String,
    pub captured_at: DateTime<Utc>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}
