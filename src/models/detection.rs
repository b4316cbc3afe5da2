use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Error;

pub const MIN_SEVERITY: i32 = 1;
pub const MAX_SEVERITY: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "detection_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheatDetectionType {
    TabSwitch,
    WindowBlur,
    KeyboardShortcut,
    RightClick,
    CopyPaste,
    TimeAnomaly,
    MultipleDevices,
}

impl CheatDetectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabSwitch => "tab_switch",
            Self::WindowBlur => "window_blur",
            Self::KeyboardShortcut => "keyboard_shortcut",
            Self::RightClick => "right_click",
            Self::CopyPaste => "copy_paste",
            Self::TimeAnomaly => "time_anomaly",
            Self::MultipleDevices => "multiple_devices",
        }
    }
}

impl fmt::Display for CheatDetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheatDetectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tab_switch" => Ok(Self::TabSwitch),
            "window_blur" => Ok(Self::WindowBlur),
            "keyboard_shortcut" => Ok(Self::KeyboardShortcut),
            "right_click" => Ok(Self::RightClick),
            "copy_paste" => Ok(Self::CopyPaste),
            "time_anomaly" => Ok(Self::TimeAnomaly),
            "multiple_devices" => Ok(Self::MultipleDevices),
            other => Err(Error::InvalidDetectionType(other.to_string())),
        }
    }
}

/// Rejects out-of-range severities before anything is persisted.
pub fn validate_severity(severity: i32) -> Result<i32, Error> {
    if (MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
        Ok(severity)
    } else {
        Err(Error::InvalidSeverity(severity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheatDetection {
    pub id: Uuid,
    pub test_session_id: Uuid,
    pub detection_type: CheatDetectionType,
    pub detection_data: JsonValue,
    pub severity: i32,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_type() {
        for raw in [
            "tab_switch",
            "window_blur",
            "keyboard_shortcut",
            "right_click",
            "copy_paste",
            "time_anomaly",
            "multiple_devices",
        ] {
            let parsed: CheatDetectionType = raw.parse().unwrap();
            assert_eq!(parsed.as_str(), raw);
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let err = "screen_share".parse::<CheatDetectionType>().unwrap_err();
        assert!(matches!(err, Error::InvalidDetectionType(t) if t == "screen_share"));
    }

    #[test]
    fn severity_bounds() {
        assert!(validate_severity(1).is_ok());
        assert!(validate_severity(5).is_ok());
        assert!(matches!(validate_severity(0), Err(Error::InvalidSeverity(0))));
        assert!(matches!(validate_severity(6), Err(Error::InvalidSeverity(6))));
    }
}
