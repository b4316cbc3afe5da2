use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::BanPolicyConfig;
use crate::error::{Error, Result};
use crate::models::detection::{validate_severity, CheatDetection, CheatDetectionType};
use crate::models::session::{SessionMetadata, SessionStatus, TestSession};
use crate::services::time_anomaly;
use crate::utils::time::{to_rfc3339, Clock};

pub const REASON_HIGH_SEVERITY: &str = "High severity cheat detection";
pub const REASON_REPEATED_TYPE: &str = "Multiple cheat detections of same type";
pub const REASON_EXCESSIVE_TOTAL: &str = "Excessive cheat detections";

/// Auto-ban thresholds, evaluated in fixed order; the first matching rule
/// wins and at most one ban happens per logged event.
#[derive(Debug, Clone, Copy)]
pub struct BanPolicy {
    severity_threshold: i32,
    same_type_threshold: i64,
    total_threshold: i64,
}

impl BanPolicy {
    pub fn new(config: BanPolicyConfig) -> Self {
        Self {
            severity_threshold: config.severity_threshold,
            same_type_threshold: config.same_type_threshold,
            total_threshold: config.total_threshold,
        }
    }

    /// Counts include the detection that was just inserted.
    pub fn evaluate(
        &self,
        severity: i32,
        unresolved_same_type: i64,
        unresolved_total: i64,
    ) -> Option<&'static str> {
        if severity >= self.severity_threshold {
            return Some(REASON_HIGH_SEVERITY);
        }
        if unresolved_same_type >= self.same_type_threshold {
            return Some(REASON_REPEATED_TYPE);
        }
        if unresolved_total >= self.total_threshold {
            return Some(REASON_EXCESSIVE_TOTAL);
        }
        None
    }
}

impl Default for BanPolicy {
    fn default() -> Self {
        Self::new(BanPolicyConfig::default())
    }
}

/// Ingests behavioral events, persists them as detections, and enforces the
/// ban policy. All mutations for one session run under a `FOR UPDATE` row
/// lock so the count-then-ban step is atomic per session.
#[derive(Clone)]
pub struct AntiCheatService {
    pool: PgPool,
    clock: Clock,
    policy: BanPolicy,
}

impl AntiCheatService {
    pub fn new(pool: PgPool, clock: Clock, policy: BanPolicy) -> Self {
        Self { pool, clock, policy }
    }

    /// Atomically write the audit event and its paired detection, then
    /// evaluate the ban policy against the just-updated detection set. A ban,
    /// if any, lands in the same transaction; a storage failure rolls the
    /// whole unit back so a detection never exists without its event.
    ///
    /// Returns the created detection and the session status after the call.
    pub async fn log_event(
        &self,
        session_id: Uuid,
        detection_type: CheatDetectionType,
        data: JsonValue,
        severity: i32,
    ) -> Result<(CheatDetection, SessionStatus)> {
        let severity = validate_severity(severity)?;

        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, TestSession>(
            r#"SELECT * FROM test_sessions WHERE id = $1 FOR UPDATE"#,
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::SessionNotFound)?;

        let now = self.clock.now();

        sqlx::query(
            r#"
            INSERT INTO test_session_events (id, test_session_id, event_type, event_data, occurred_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session.id)
        .bind(detection_type.as_str())
        .bind(&data)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let detection = sqlx::query_as::<_, CheatDetection>(
            r#"
            INSERT INTO cheat_detections (
                id, test_session_id, detection_type, detection_data, severity,
                is_resolved, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session.id)
        .bind(detection_type)
        .bind(&data)
        .bind(severity)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let unresolved_same_type: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM cheat_detections
            WHERE test_session_id = $1 AND detection_type = $2 AND is_resolved = FALSE
            "#,
        )
        .bind(session.id)
        .bind(detection_type)
        .fetch_one(&mut *tx)
        .await?;

        let unresolved_total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM cheat_detections
            WHERE test_session_id = $1 AND is_resolved = FALSE
            "#,
        )
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        let status = match self
            .policy
            .evaluate(severity, unresolved_same_type, unresolved_total)
        {
            Some(reason) => self.ban_locked(&mut tx, &session, reason).await?,
            None => session.status,
        };

        tx.commit().await?;

        tracing::info!(
            session_token = %session.session_token,
            detection_type = %detection_type,
            severity,
            status = status.as_str(),
            "Cheat event logged"
        );
        Ok((detection, status))
    }

    /// Terminate a session for cheating. Idempotent: banning an already
    /// banned session is a no-op, with no duplicate metadata stamps and no
    /// double propagation.
    pub async fn ban_session(&self, session_token: &str, reason: &str) -> Result<TestSession> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, TestSession>(
            r#"SELECT * FROM test_sessions WHERE session_token = $1 FOR UPDATE"#,
        )
        .bind(session_token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::SessionNotFound)?;

        self.ban_locked(&mut tx, &session, reason).await?;
        tx.commit().await?;

        let fresh = sqlx::query_as::<_, TestSession>(
            r#"SELECT * FROM test_sessions WHERE id = $1"#,
        )
        .bind(session.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(fresh)
    }

    /// Newest-first detection history for a session. Read-only.
    pub async fn get_detections(&self, session_id: Uuid) -> Result<Vec<CheatDetection>> {
        let detections = sqlx::query_as::<_, CheatDetection>(
            r#"
            SELECT * FROM cheat_detections
            WHERE test_session_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(detections)
    }

    /// Post-submission timing check. Emits at most one TIME_ANOMALY detection
    /// through the normal logging pipeline.
    pub async fn evaluate_time_anomaly(
        &self,
        session: &TestSession,
    ) -> Result<Option<CheatDetection>> {
        let test = sqlx::query_as::<_, crate::models::test::Test>(
            r#"SELECT * FROM tests WHERE id = $1"#,
        )
        .bind(session.test_id)
        .fetch_one(&self.pool)
        .await?;

        let answered_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM test_session_answers WHERE test_session_id = $1"#,
        )
        .bind(session.id)
        .fetch_one(&self.pool)
        .await?;

        let Some(anomaly) = time_anomaly::detect(
            test.duration_minutes,
            test.question_count,
            session.time_spent_seconds,
            answered_count,
        ) else {
            return Ok(None);
        };

        let (detection, _) = self
            .log_event(
                session.id,
                CheatDetectionType::TimeAnomaly,
                anomaly.to_data(),
                anomaly.severity(),
            )
            .await?;
        Ok(Some(detection))
    }

    /// Ban step shared by the policy path and the direct path. The caller
    /// holds the session row lock. Only in-progress sessions transition;
    /// terminal statuses keep their evidence but are never rewritten.
    async fn ban_locked(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session: &TestSession,
        reason: &str,
    ) -> Result<SessionStatus> {
        match session.status {
            SessionStatus::Banned => Ok(SessionStatus::Banned),
            SessionStatus::Completed | SessionStatus::Abandoned => {
                tracing::warn!(
                    session_token = %session.session_token,
                    status = session.status.as_str(),
                    reason,
                    "Ban requested for terminal session; detection kept, status unchanged"
                );
                Ok(session.status)
            }
            SessionStatus::InProgress => {
                let now = self.clock.now();
                let mut metadata: SessionMetadata = session.metadata.0.clone();
                metadata.banned_at = Some(to_rfc3339(now));
                metadata.ban_reason = Some(reason.to_string());

                sqlx::query(
                    r#"
                    UPDATE test_sessions
                    SET status = $1,
                        time_spent_seconds = GREATEST(ROUND(EXTRACT(EPOCH FROM ($2::timestamptz - started_at)))::INT, 0),
                        metadata = $3,
                        updated_at = $2
                    WHERE id = $4
                    "#,
                )
                .bind(SessionStatus::Banned)
                .bind(now)
                .bind(Json(metadata))
                .bind(session.id)
                .execute(&mut **tx)
                .await?;

                self.propagate_ban(tx, session).await?;

                tracing::warn!(
                    session_token = %session.session_token,
                    reason,
                    "Test session banned"
                );
                Ok(SessionStatus::Banned)
            }
        }
    }

    /// Cascade a session ban to the owning participant. One-directional and
    /// irreversible here; public users carry no cross-session ban flag.
    async fn propagate_ban(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session: &TestSession,
    ) -> Result<()> {
        let Some(participant_id) = session.owner().participant_id() else {
            return Ok(());
        };

        let now = self.clock.now();
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET banned_at = $1, updated_at = $1
            WHERE id = $2 AND banned_at IS NULL
            "#,
        )
        .bind(now)
        .bind(participant_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            tracing::warn!(%participant_id, "Participant permanently banned");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rule_fires_at_threshold() {
        let policy = BanPolicy::default();
        assert_eq!(policy.evaluate(5, 1, 1), Some(REASON_HIGH_SEVERITY));
        assert_eq!(policy.evaluate(4, 1, 1), None);
    }

    #[test]
    fn repetition_rule_needs_three_of_a_kind() {
        let policy = BanPolicy::default();
        assert_eq!(policy.evaluate(1, 2, 2), None);
        assert_eq!(policy.evaluate(1, 3, 3), Some(REASON_REPEATED_TYPE));
    }

    #[test]
    fn volume_rule_needs_ten_total() {
        let policy = BanPolicy::default();
        assert_eq!(policy.evaluate(1, 2, 9), None);
        assert_eq!(policy.evaluate(1, 2, 10), Some(REASON_EXCESSIVE_TOTAL));
    }

    #[test]
    fn rules_evaluate_in_fixed_order() {
        let policy = BanPolicy::default();
        // All three satisfied: severity wins.
        assert_eq!(policy.evaluate(5, 3, 10), Some(REASON_HIGH_SEVERITY));
        // Repetition beats volume.
        assert_eq!(policy.evaluate(1, 3, 10), Some(REASON_REPEATED_TYPE));
    }

    #[test]
    fn thresholds_are_injectable() {
        let policy = BanPolicy::new(BanPolicyConfig {
            severity_threshold: 4,
            same_type_threshold: 2,
            total_threshold: 5,
        });
        assert_eq!(policy.evaluate(4, 1, 1), Some(REASON_HIGH_SEVERITY));
        assert_eq!(policy.evaluate(1, 2, 2), Some(REASON_REPEATED_TYPE));
        assert_eq!(policy.evaluate(1, 1, 5), Some(REASON_EXCESSIVE_TOTAL));
    }
}
