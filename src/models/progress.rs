use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

use super::PgStore;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Progress {
    pub id: i64,
    pub student_id: i64,
    pub module_id: i64,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Returns the existing row when the module was already started.
    async fn start_progress(&self, student_id: i64, module_id: i64) -> Result<Progress, StoreError>;
    /// Marks the module completed. `completed_at` is only stamped the first time.
    async fn complete_progress(&self, student_id: i64, module_id: i64) -> Result<Progress, StoreError>;
    async fn list_progress(&self, student_id: i64, course_id: i64) -> Result<Vec<Progress>, StoreError>;
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn start_progress(&self, student_id: i64, module_id: i64) -> Result<Progress, StoreError> {
        sqlx::query(
            r#"
                INSERT INTO progress (student_id, module_id)
                VALUES ($1, $2)
                ON CONFLICT ON CONSTRAINT progress_student_module_key DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(module_id)
        .execute(&self.pool)
        .await?;

        let result = sqlx::query_as::<_, Progress>(
            "SELECT * FROM progress WHERE student_id = $1 AND module_id = $2",
        )
        .bind(student_id)
        .bind(module_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn complete_progress(&self, student_id: i64, module_id: i64) -> Result<Progress, StoreError> {
        let result = sqlx::query_as::<_, Progress>(
            r#"
                INSERT INTO progress (student_id, module_id, completed, completed_at)
                VALUES ($1, $2, TRUE, NOW())
                ON CONFLICT ON CONSTRAINT progress_student_module_key
                DO UPDATE SET completed = TRUE,
                              completed_at = COALESCE(progress.completed_at, EXCLUDED.completed_at)
                RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(module_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_progress(&self, student_id: i64, course_id: i64) -> Result<Vec<Progress>, StoreError> {
        let result = sqlx::query_as::<_, Progress>(
            r#"
                SELECT p.* FROM progress p
                JOIN modules m ON m.id = p.module_id
                WHERE p.student_id = $1 AND m.course_id = $2
                ORDER BY m.position
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }
}
