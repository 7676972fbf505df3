use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

use super::PgStore;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub issued_on: NaiveDate,
    pub code: String,
    pub document_path: String,
}

#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub student_id: i64,
    pub course_id: i64,
    pub issued_on: NaiveDate,
    pub code: String,
    pub document_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CertificateTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub file_path: String,
}

#[async_trait]
pub trait CertificateStore: Send + Sync {
    async fn create_certificate(&self, certificate: NewCertificate) -> Result<Certificate, StoreError>;
    async fn find_certificate(&self, id: i64) -> Result<Option<Certificate>, StoreError>;
    async fn find_certificate_for(&self, student_id: i64, course_id: i64) -> Result<Option<Certificate>, StoreError>;
    async fn find_certificate_by_code(&self, code: &str) -> Result<Option<Certificate>, StoreError>;
    async fn list_certificates(&self, student_id: Option<i64>) -> Result<Vec<Certificate>, StoreError>;
    async fn list_course_certificates(&self, course_id: i64) -> Result<Vec<Certificate>, StoreError>;

    async fn create_template(&self, template: NewTemplate) -> Result<CertificateTemplate, StoreError>;
    async fn find_template(&self, id: i64) -> Result<Option<CertificateTemplate>, StoreError>;
    async fn list_templates(&self) -> Result<Vec<CertificateTemplate>, StoreError>;
    async fn delete_template(&self, id: i64) -> Result<(), StoreError>;
    /// Re-inserts a previously deleted template under its original id.
    async fn restore_template(&self, template: &CertificateTemplate) -> Result<(), StoreError>;
}

#[async_trait]
impl CertificateStore for PgStore {
    async fn create_certificate(&self, certificate: NewCertificate) -> Result<Certificate, StoreError> {
        let result = sqlx::query_as::<_, Certificate>(
            r#"
                INSERT INTO certificates (student_id, course_id, issued_on, code, document_path)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            "#,
        )
        .bind(certificate.student_id)
        .bind(certificate.course_id)
        .bind(certificate.issued_on)
        .bind(&certificate.code)
        .bind(&certificate.document_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_certificate(&self, id: i64) -> Result<Option<Certificate>, StoreError> {
        let result = sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    async fn find_certificate_for(&self, student_id: i64, course_id: i64) -> Result<Option<Certificate>, StoreError> {
        let result = sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_certificate_by_code(&self, code: &str) -> Result<Option<Certificate>, StoreError> {
        let result = sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    async fn list_certificates(&self, student_id: Option<i64>) -> Result<Vec<Certificate>, StoreError> {
        let result = sqlx::query_as::<_, Certificate>(
            r#"
                SELECT * FROM certificates
                WHERE ($1::BIGINT IS NULL OR student_id = $1)
                ORDER BY issued_on DESC, id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_course_certificates(&self, course_id: i64) -> Result<Vec<Certificate>, StoreError> {
        let result = sqlx::query_as::<_, Certificate>(
            r#"
                SELECT * FROM certificates
                WHERE course_id = $1
                ORDER BY id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }

    async fn create_template(&self, template: NewTemplate) -> Result<CertificateTemplate, StoreError> {
        let result = sqlx::query_as::<_, CertificateTemplate>(
            r#"
                INSERT INTO certificate_templates (name, description, file_path)
                VALUES ($1, $2, $3)
                RETURNING *
            "#,
        )
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.file_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_template(&self, id: i64) -> Result<Option<CertificateTemplate>, StoreError> {
        let result = sqlx::query_as::<_, CertificateTemplate>(
            "SELECT * FROM certificate_templates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_templates(&self) -> Result<Vec<CertificateTemplate>, StoreError> {
        let result = sqlx::query_as::<_, CertificateTemplate>(
            "SELECT * FROM certificate_templates ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }

    async fn delete_template(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM certificate_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn restore_template(&self, template: &CertificateTemplate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
                INSERT INTO certificate_templates (id, name, description, file_path, created_at)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.file_path)
        .bind(template.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
