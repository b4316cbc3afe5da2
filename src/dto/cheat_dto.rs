use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::detection::{CheatDetection, CheatDetectionType};
use crate::models::session::SessionStatus;

/// `detection_type` arrives as a raw string so unknown values surface as the
/// dedicated invalid_detection_type kind instead of a serde error.
#[derive(Debug, Clone, Deserialize)]
pub struct LogCheatEventRequest {
    pub detection_type: String,
    pub detection_data: Option<JsonValue>,
    pub severity: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogCheatEventResponse {
    pub detection: DetectionView,
    pub session_status: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionView {
    pub id: Uuid,
    pub detection_type: CheatDetectionType,
    pub detection_data: JsonValue,
    pub severity: i32,
    pub is_resolved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CheatDetection> for DetectionView {
    fn from(detection: CheatDetection) -> Self {
        Self {
            id: detection.id,
            detection_type: detection.detection_type,
            detection_data: detection.detection_data,
            severity: detection.severity,
            is_resolved: detection.is_resolved,
            created_at: detection.created_at,
        }
    }
}
