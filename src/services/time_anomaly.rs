use serde_json::{json, Value as JsonValue};

/// Share of the expected duration below which a fully answered test counts
/// as implausibly fast.
const MIN_PLAUSIBLE_RATIO: f64 = 0.3;
/// Share of the expected duration above which a session counts as
/// implausibly slow.
const MAX_PLAUSIBLE_RATIO: f64 = 1.5;

pub const TOO_FAST_SEVERITY: i32 = 3;
pub const TOO_SLOW_SEVERITY: i32 = 2;

/// A detection synthesized from elapsed time rather than client telemetry.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeAnomaly {
    TooFast {
        time_spent: i32,
        expected_min_time: f64,
    },
    TooSlow {
        time_spent: i32,
        expected_max_time: f64,
    },
}

impl TimeAnomaly {
    pub fn severity(&self) -> i32 {
        match self {
            Self::TooFast { .. } => TOO_FAST_SEVERITY,
            Self::TooSlow { .. } => TOO_SLOW_SEVERITY,
        }
    }

    pub fn anomaly_type(&self) -> &'static str {
        match self {
            Self::TooFast { .. } => "too_fast",
            Self::TooSlow { .. } => "too_slow",
        }
    }

    pub fn to_data(&self) -> JsonValue {
        match self {
            Self::TooFast {
                time_spent,
                expected_min_time,
            } => json!({
                "anomaly_type": "too_fast",
                "time_spent": time_spent,
                "expected_min_time": expected_min_time,
            }),
            Self::TooSlow {
                time_spent,
                expected_max_time,
            } => json!({
                "anomaly_type": "too_slow",
                "time_spent": time_spent,
                "expected_max_time": expected_max_time,
            }),
        }
    }
}

/// Compare actual elapsed time against the plausible window derived from the
/// test duration. Finishing fast only counts once every question has an
/// answer. At most one anomaly per evaluation; too-fast takes precedence.
pub fn detect(
    duration_minutes: i32,
    question_count: i32,
    time_spent_seconds: i32,
    answered_count: i64,
) -> Option<TimeAnomaly> {
    let expected = f64::from(duration_minutes) * 60.0;
    let min_plausible = expected * MIN_PLAUSIBLE_RATIO;
    let max_plausible = expected * MAX_PLAUSIBLE_RATIO;
    let spent = f64::from(time_spent_seconds);

    if spent < min_plausible && answered_count >= i64::from(question_count) {
        return Some(TimeAnomaly::TooFast {
            time_spent: time_spent_seconds,
            expected_min_time: min_plausible,
        });
    }

    if spent > max_plausible {
        return Some(TimeAnomaly::TooSlow {
            time_spent: time_spent_seconds,
            expected_max_time: max_plausible,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_answered_fast_finish_is_too_fast() {
        // 60-minute test: plausible window is [1080, 5400] seconds.
        let anomaly = detect(60, 20, 1000, 20).expect("anomaly");
        assert_eq!(anomaly.severity(), 3);
        assert_eq!(anomaly.anomaly_type(), "too_fast");
        let data = anomaly.to_data();
        assert_eq!(data["time_spent"], 1000);
        assert_eq!(data["expected_min_time"], 1080.0);
    }

    #[test]
    fn fast_finish_without_all_answers_is_not_flagged() {
        assert_eq!(detect(60, 20, 1000, 19), None);
    }

    #[test]
    fn overlong_session_is_too_slow() {
        let anomaly = detect(60, 20, 6000, 5).expect("anomaly");
        assert_eq!(anomaly.severity(), 2);
        assert_eq!(anomaly.anomaly_type(), "too_slow");
        let data = anomaly.to_data();
        assert_eq!(data["time_spent"], 6000);
        assert_eq!(data["expected_max_time"], 5400.0);
    }

    #[test]
    fn plausible_window_is_quiet() {
        assert_eq!(detect(60, 20, 1080, 20), None); // exactly min
        assert_eq!(detect(60, 20, 3600, 20), None);
        assert_eq!(detect(60, 20, 5400, 20), None); // exactly max
    }

    #[test]
    fn at_most_one_anomaly_and_too_fast_wins() {
        // Degenerate zero-duration test satisfies both comparisons only on
        // the slow side; a fully answered instant finish must not double-fire.
        let anomaly = detect(0, 1, 1, 1).expect("anomaly");
        assert_eq!(anomaly.anomaly_type(), "too_slow");

        let anomaly = detect(60, 1, 100, 1).expect("anomaly");
        assert_eq!(anomaly.anomaly_type(), "too_fast");
    }
}
