use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::photo::TestSessionPhoto;
use crate::utils::time::{to_rfc3339, Clock};

/// Proctoring photo evidence store. Blobs land under the uploads dir, rows
/// associate them to a session by id; session state is never touched.
#[derive(Clone)]
pub struct PhotoService {
    pool: PgPool,
    clock: Clock,
    uploads_dir: String,
}

impl PhotoService {
    pub fn new(pool: PgPool, clock: Clock, uploads_dir: String) -> Self {
        Self {
            pool,
            clock,
            uploads_dir,
        }
    }

    pub async fn capture(
        &self,
        session_id: Uuid,
        data: bytes::Bytes,
        extension: &str,
    ) -> Result<TestSessionPhoto> {
        let dir = format!("{}/test-sessions/photos", self.uploads_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let file_size = data.len();
        let path = format!("{}/{}.{}", dir, Uuid::new_v4(), extension);
        tokio::fs::write(&path, data).await?;

        let now = self.clock.now();
        let photo = sqlx::query_as::<_, TestSessionPhoto>(
            r#"
            INSERT INTO test_session_photos (id, test_session_id, photo_path, captured_at, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(&path)
        .bind(now)
        .bind(json!({
            "file_size": file_size,
            "captured_at": to_rfc3339(now),
        }))
        .fetch_one(&self.pool)
        .await?;

        Ok(photo)
    }

    pub async fn list(&self, session_id: Uuid) -> Result<Vec<TestSessionPhoto>> {
        let photos = sqlx::query_as::<_, TestSessionPhoto>(
            r#"
            SELECT * FROM test_session_photos
            WHERE test_session_id = $1
            ORDER BY captured_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }
}
