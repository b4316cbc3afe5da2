use std::collections::HashMap;

use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::SessionAnswer;
use crate::models::assignment::TestAssignment;
use crate::models::owner::SessionOwner;
use crate::models::public_user::PublicUser;
use crate::models::session::{SessionMetadata, SessionStatus, TestSession};
use crate::models::test::Test;
use crate::utils::time::{to_rfc3339, Clock};
use crate::utils::token::generate_session_token;

/// Owns the `TestSession` lifecycle: start, autosave, submit, heartbeat, and
/// the abandoned-session sweep. Sessions are never deleted, only moved to a
/// terminal status.
#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    clock: Clock,
}

impl SessionService {
    pub fn new(pool: PgPool, clock: Clock) -> Self {
        Self { pool, clock }
    }

    /// Find-or-create the single in-progress session for an
    /// (owner, test, assignment?) key. Concurrent duplicate calls serialize
    /// on a per-key advisory lock, so exactly one session is ever created;
    /// the loser of any race gets the winner's row back unchanged.
    pub async fn start(
        &self,
        owner: SessionOwner,
        test: &Test,
        assignment: Option<&TestAssignment>,
    ) -> Result<TestSession> {
        let (owner_type, owner_id) = owner.into_parts();
        let assignment_id = assignment.map(|a| a.id);

        let mut tx = self.pool.begin().await?;

        let key = format!(
            "test_session_start:{}:{}:{}:{}",
            owner_type.as_str(),
            owner_id,
            test.id,
            assignment_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query_as::<_, TestSession>(
            r#"
            SELECT * FROM test_sessions
            WHERE owner_type = $1 AND owner_id = $2 AND test_id = $3
              AND test_assignment_id IS NOT DISTINCT FROM $4
              AND status = $5
            "#,
        )
        .bind(owner_type)
        .bind(owner_id)
        .bind(test.id)
        .bind(assignment_id)
        .bind(SessionStatus::InProgress)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(session) = existing {
            tx.commit().await?;
            return Ok(session);
        }

        let now = self.clock.now();
        let metadata = SessionMetadata {
            started_at: Some(to_rfc3339(now)),
            test_duration_minutes: Some(test.duration_minutes),
            ..Default::default()
        };

        let session = sqlx::query_as::<_, TestSession>(
            r#"
            INSERT INTO test_sessions (
                id, session_token, owner_type, owner_id, test_id, test_assignment_id,
                status, started_at, completed_at, time_spent_seconds, metadata,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, 0, $9, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(generate_session_token())
        .bind(owner_type)
        .bind(owner_id)
        .bind(test.id)
        .bind(assignment_id)
        .bind(SessionStatus::InProgress)
        .bind(now)
        .bind(Json(metadata))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            session_token = %session.session_token,
            test_id = %test.id,
            "Test session started"
        );
        Ok(session)
    }

    pub async fn get_by_token(&self, session_token: &str) -> Result<TestSession> {
        sqlx::query_as::<_, TestSession>(r#"SELECT * FROM test_sessions WHERE session_token = $1"#)
            .bind(session_token)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::SessionNotFound)
    }

    pub async fn get_answers(&self, session_id: Uuid) -> Result<Vec<SessionAnswer>> {
        let answers = sqlx::query_as::<_, SessionAnswer>(
            r#"
            SELECT * FROM test_session_answers
            WHERE test_session_id = $1
            ORDER BY question_id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    /// Upsert the given answers (last write per question wins), refresh the
    /// elapsed time from the wall clock, and stamp `last_saved_at`. Replaying
    /// the same payload is a no-op beyond the timestamps.
    pub async fn autosave(
        &self,
        session_token: &str,
        answers: &HashMap<String, JsonValue>,
    ) -> Result<TestSession> {
        let mut tx = self.pool.begin().await?;

        let session = self.lock_by_token(&mut tx, session_token).await?;
        if !session.is_active() {
            return Err(Error::SessionNotActive);
        }

        let now = self.clock.now();
        for (question_id, answer) in answers {
            sqlx::query(
                r#"
                INSERT INTO test_session_answers (
                    id, test_session_id, question_id, answer, is_correct, points,
                    created_at, updated_at
                ) VALUES ($1, $2, $3, $4, NULL, 0, $5, $5)
                ON CONFLICT (test_session_id, question_id)
                DO UPDATE SET answer = EXCLUDED.answer, updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session.id)
            .bind(question_id)
            .bind(answer)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let mut metadata = session.metadata.0.clone();
        metadata.last_saved_at = Some(to_rfc3339(now));

        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET time_spent_seconds = GREATEST(ROUND(EXTRACT(EPOCH FROM ($1::timestamptz - started_at)))::INT, 0),
                metadata = $2,
                updated_at = $1
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(Json(metadata))
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// The only path that completes a session and retires its assignment.
    pub async fn submit(&self, session_token: &str) -> Result<TestSession> {
        let mut tx = self.pool.begin().await?;

        let session = self.lock_by_token(&mut tx, session_token).await?;
        if !session.is_active() {
            return Err(Error::SessionNotActive);
        }

        let now = self.clock.now();
        let mut metadata = session.metadata.0.clone();
        metadata.submitted_at = Some(to_rfc3339(now));

        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET status = $1,
                completed_at = $2,
                time_spent_seconds = GREATEST(ROUND(EXTRACT(EPOCH FROM ($2::timestamptz - started_at)))::INT, 0),
                metadata = $3,
                updated_at = $2
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(SessionStatus::Completed)
        .bind(now)
        .bind(Json(metadata))
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(assignment_id) = session.test_assignment_id {
            sqlx::query(
                r#"
                UPDATE test_assignments
                SET is_completed = TRUE, completed_at = $1, updated_at = $1
                WHERE id = $2
                "#,
            )
            .bind(now)
            .bind(assignment_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            session_token = %updated.session_token,
            time_spent_seconds = updated.time_spent_seconds,
            "Test session submitted"
        );
        Ok(updated)
    }

    /// Pure elapsed-time refresh; safe to call arbitrarily often and out of
    /// order because the value is recomputed from `started_at`, never
    /// accumulated.
    pub async fn heartbeat(&self, session_token: &str) -> Result<TestSession> {
        let now = self.clock.now();
        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET time_spent_seconds = GREATEST(ROUND(EXTRACT(EPOCH FROM ($1::timestamptz - started_at)))::INT, 0),
                updated_at = $1
            WHERE session_token = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(session_token)
        .bind(SessionStatus::InProgress)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(session) => Ok(session),
            None => {
                // Distinguish a missing session from a finished one.
                self.get_by_token(session_token).await?;
                Err(Error::SessionNotActive)
            }
        }
    }

    /// Timeout sweep collaborator: abandon in-progress sessions whose
    /// allotted duration plus grace has fully elapsed.
    pub async fn sweep_abandoned(&self, grace_seconds: i64) -> Result<u64> {
        let now = self.clock.now();
        let result = sqlx::query(
            r#"
            UPDATE test_sessions s
            SET status = $1,
                time_spent_seconds = GREATEST(ROUND(EXTRACT(EPOCH FROM ($2::timestamptz - s.started_at)))::INT, 0),
                metadata = s.metadata || jsonb_build_object('abandoned_at', $3::text),
                updated_at = $2
            FROM tests t
            WHERE s.test_id = t.id
              AND s.status = $4
              AND s.started_at + make_interval(secs => (t.duration_minutes * 60 + $5)::double precision) <= $2
            "#,
        )
        .bind(SessionStatus::Abandoned)
        .bind(now)
        .bind(to_rfc3339(now))
        .bind(SessionStatus::InProgress)
        .bind(grace_seconds)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            tracing::info!(swept, "Abandoned expired test sessions");
        }
        Ok(swept)
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<Test> {
        sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))
    }

    pub async fn get_public_user(&self, public_user_id: Uuid) -> Result<PublicUser> {
        sqlx::query_as::<_, PublicUser>(r#"SELECT * FROM public_users WHERE id = $1"#)
            .bind(public_user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Public user not found".to_string()))
    }

    async fn lock_by_token(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session_token: &str,
    ) -> Result<TestSession> {
        sqlx::query_as::<_, TestSession>(
            r#"SELECT * FROM test_sessions WHERE session_token = $1 FOR UPDATE"#,
        )
        .bind(session_token)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::SessionNotFound)
    }
}
