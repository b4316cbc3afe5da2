use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A company's grant of one test to one participant within a time window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAssignment {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub test_id: Uuid,
    pub unique_token: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestAssignment {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_date
    }

    pub fn is_not_started(&self, now: DateTime<Utc>) -> bool {
        now < self.start_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn assignment(start: DateTime<Utc>, end: DateTime<Utc>) -> TestAssignment {
        TestAssignment {
            id: Uuid::new_v4(),
            participant_id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            unique_token: "tok".into(),
            start_date: start,
            end_date: end,
            is_completed: false,
            completed_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn window_checks() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let open = assignment(now - Duration::hours(1), now + Duration::hours(1));
        assert!(!open.is_expired(now));
        assert!(!open.is_not_started(now));

        let future = assignment(now + Duration::hours(1), now + Duration::hours(2));
        assert!(future.is_not_started(now));

        let past = assignment(now - Duration::hours(2), now - Duration::hours(1));
        assert!(past.is_expired(now));
    }
}
