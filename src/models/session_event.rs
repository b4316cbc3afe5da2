use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only audit log. Every cheat detection writes exactly one paired
/// event in the same transaction; events without detections are reserved for
/// non-cheat telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSessionEvent {
    pub id: Uuid,
    pub test_session_id: Uuid,
    pub event_type: String,
    pub event_data: JsonValue,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
