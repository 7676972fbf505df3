use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

use super::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "course_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    Recorded,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "course_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub course_type: CourseType,
    pub status: CourseStatus,
    pub material_url: Option<String>,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_active(&self) -> bool {
        self.status == CourseStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub instructor_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub course_type: CourseType,
    pub status: CourseStatus,
    pub material_url: Option<String>,
}

/// Editable course fields. The slug is never part of an edit.
#[derive(Debug, Clone)]
pub struct CourseChanges {
    pub instructor_id: i64,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub course_type: CourseType,
    pub status: CourseStatus,
    pub material_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CourseFilter {
    pub instructor_id: Option<i64>,
    pub active_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub content_url: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub course_id: i64,
    pub title: String,
    pub content_url: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub module_id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError>;
    async fn create_course(&self, course: NewCourse) -> Result<Course, StoreError>;
    async fn find_course(&self, id: i64) -> Result<Option<Course>, StoreError>;
    async fn list_courses(&self, filter: CourseFilter) -> Result<Vec<Course>, StoreError>;
    async fn update_course(&self, id: i64, changes: CourseChanges) -> Result<Course, StoreError>;
    async fn set_course_document(&self, id: i64, document_path: Option<String>) -> Result<Course, StoreError>;
    /// Removes the course and every row that references it.
    async fn delete_course(&self, id: i64) -> Result<(), StoreError>;

    async fn create_module(&self, module: NewModule) -> Result<Module, StoreError>;
    async fn find_module(&self, id: i64) -> Result<Option<Module>, StoreError>;
    async fn list_modules(&self, course_id: i64) -> Result<Vec<Module>, StoreError>;
    /// Assigns positions 1..n following `ordered_ids` in one atomic step.
    async fn reorder_modules(&self, course_id: i64, ordered_ids: &[i64]) -> Result<Vec<Module>, StoreError>;
    async fn delete_module(&self, id: i64) -> Result<(), StoreError>;

    async fn create_evaluation(&self, evaluation: NewEvaluation) -> Result<Evaluation, StoreError>;
    async fn find_evaluation_for_module(&self, module_id: i64) -> Result<Option<Evaluation>, StoreError>;
}

#[async_trait]
impl CourseStore for PgStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM courses WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn create_course(&self, course: NewCourse) -> Result<Course, StoreError> {
        let result = sqlx::query_as::<_, Course>(
            r#"
                INSERT INTO courses (instructor_id, title, slug, description, price, course_type, status, material_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            "#,
        )
        .bind(course.instructor_id)
        .bind(&course.title)
        .bind(&course.slug)
        .bind(&course.description)
        .bind(course.price)
        .bind(course.course_type)
        .bind(course.status)
        .bind(&course.material_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        let result = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    async fn list_courses(&self, filter: CourseFilter) -> Result<Vec<Course>, StoreError> {
        let result = sqlx::query_as::<_, Course>(
            r#"
                SELECT * FROM courses
                WHERE ($1::BIGINT IS NULL OR instructor_id = $1)
                  AND (NOT $2 OR status = 'active')
                ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.instructor_id)
        .bind(filter.active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }

    async fn update_course(&self, id: i64, changes: CourseChanges) -> Result<Course, StoreError> {
        let result = sqlx::query_as::<_, Course>(
            r#"
                UPDATE courses
                SET instructor_id = $2, title = $3, description = $4, price = $5,
                    course_type = $6, status = $7, material_url = $8, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.instructor_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(changes.course_type)
        .bind(changes.status)
        .bind(&changes.material_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn set_course_document(&self, id: i64, document_path: Option<String>) -> Result<Course, StoreError> {
        let result = sqlx::query_as::<_, Course>(
            "UPDATE courses SET document_path = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(document_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn delete_course(&self, id: i64) -> Result<(), StoreError> {
        // modules, evaluations, purchases, progress and certificates go via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_module(&self, module: NewModule) -> Result<Module, StoreError> {
        let result = sqlx::query_as::<_, Module>(
            r#"
                INSERT INTO modules (course_id, title, content_url, position)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(module.course_id)
        .bind(&module.title)
        .bind(&module.content_url)
        .bind(module.position)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_module(&self, id: i64) -> Result<Option<Module>, StoreError> {
        let result = sqlx::query_as::<_, Module>("SELECT * FROM modules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    async fn list_modules(&self, course_id: i64) -> Result<Vec<Module>, StoreError> {
        let result = sqlx::query_as::<_, Module>(
            "SELECT * FROM modules WHERE course_id = $1 ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }

    async fn reorder_modules(&self, course_id: i64, ordered_ids: &[i64]) -> Result<Vec<Module>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET CONSTRAINTS modules_course_position_key DEFERRED")
            .execute(&mut *tx)
            .await?;

        for (index, module_id) in ordered_ids.iter().enumerate() {
            let result = sqlx::query("UPDATE modules SET position = $3 WHERE id = $1 AND course_id = $2")
                .bind(module_id)
                .bind(course_id)
                .bind(index as i32 + 1)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
        }

        tx.commit().await?;
        self.list_modules(course_id).await
    }

    async fn delete_module(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_evaluation(&self, evaluation: NewEvaluation) -> Result<Evaluation, StoreError> {
        let result = sqlx::query_as::<_, Evaluation>(
            r#"
                INSERT INTO evaluations (module_id, title, description)
                VALUES ($1, $2, $3)
                RETURNING *
            "#,
        )
        .bind(evaluation.module_id)
        .bind(&evaluation.title)
        .bind(&evaluation.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_evaluation_for_module(&self, module_id: i64) -> Result<Option<Evaluation>, StoreError> {
        let result = sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluations WHERE module_id = $1")
            .bind(module_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }
}
