use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::assignment::TestAssignment;
use crate::models::participant::Participant;
use crate::utils::time::Clock;

/// Gate for the participant flow: resolves an opaque assignment token and
/// rejects everything the session core must never see. `SessionService::start`
/// trusts this to have run first.
#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
    clock: Clock,
}

impl AssignmentService {
    pub fn new(pool: PgPool, clock: Clock) -> Self {
        Self { pool, clock }
    }

    pub async fn validate_token(&self, token: &str) -> Result<(TestAssignment, Participant)> {
        let assignment = sqlx::query_as::<_, TestAssignment>(
            r#"SELECT * FROM test_assignments WHERE unique_token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Invalid assignment token".to_string()))?;

        let participant = sqlx::query_as::<_, Participant>(
            r#"SELECT * FROM participants WHERE id = $1"#,
        )
        .bind(assignment.participant_id)
        .fetch_one(&self.pool)
        .await?;

        if participant.is_banned() {
            return Err(Error::AccessDenied(
                "You have been banned from taking tests".to_string(),
            ));
        }

        let now = self.clock.now();
        if assignment.is_not_started(now) || assignment.is_expired(now) {
            return Err(Error::AccessDenied(
                "Test assignment period has expired or not yet started".to_string(),
            ));
        }

        if assignment.is_completed {
            return Err(Error::AccessDenied(
                "Test assignment already completed".to_string(),
            ));
        }

        Ok((assignment, participant))
    }
}
