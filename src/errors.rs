use actix_web::{http::{header, StatusCode}, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use derive_more::derive::{Display, Error as DeriveMoreError};

use crate::{models::constraint, paths, schema::{Notice, NoticeLevel}};

#[derive(Debug, Error)]
pub enum AppError{
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Cant bind to the Socket")]
    SocketBind,
    #[error("Cant connect to the DB")]
    DbConnect,
    #[error("Cant run the DB migrations")]
    Migrate,
    #[error("Cant start the server")]
    ServerStart,
}

#[derive(Debug, Display, DeriveMoreError, Serialize, Deserialize)]
#[display("error :{}", error)]
pub struct CustomError{
    pub error:String
}

impl ResponseError for CustomError{}

/// Failures reported by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint `{0}` violated")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn violates(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation(c) if c == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.constraint().unwrap_or_default().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{0}` not found")]
    NotFound(String),
    #[error("asset io error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
#[error("document rendering failed: {0}")]
pub struct RenderError(pub String);

/// Outcome of a request that did not produce its happy-path response.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{notice}")]
    Denied { notice: String, redirect: String },
    #[error("{0}")]
    Validation(String),
    #[error("You are already enrolled in this course.")]
    AlreadyEnrolled { course_id: i64 },
    #[error("A certificate already exists for this student and course.")]
    DuplicateCertificate,
    #[error("{0}")]
    Duplicate(String),
    #[error("Not found")]
    NotFound,
    #[error("Something went wrong, please try again later.")]
    Collaborator(String),
    #[error("Internal Server Error")]
    Internal(String),
}

fn duplicate_message(name: &str) -> &'static str {
    match name {
        constraint::USERS_USERNAME => "A user with this username already exists.",
        constraint::USERS_EMAIL => "A user with this email already exists.",
        constraint::COURSES_SLUG => "A course with this slug already exists.",
        constraint::MODULES_COURSE_POSITION => "Another module already uses this position.",
        constraint::EVALUATIONS_MODULE => "This module already has an evaluation.",
        constraint::PURCHASES_STUDENT_COURSE => "You already purchased this course.",
        constraint::PROGRESS_STUDENT_MODULE => "Progress for this module already exists.",
        constraint::CERTIFICATES_STUDENT_COURSE => "A certificate already exists for this student and course.",
        constraint::CERTIFICATES_CODE => "Certificate code already in use.",
        _ => "This record already exists.",
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::UniqueViolation(name) => ServiceError::Duplicate(duplicate_message(&name).to_string()),
            StoreError::Database(e) => ServiceError::Internal(e),
        }
    }
}

impl From<AssetError> for ServiceError {
    fn from(err: AssetError) -> Self {
        ServiceError::Collaborator(err.to_string())
    }
}

impl From<RenderError> for ServiceError {
    fn from(err: RenderError) -> Self {
        ServiceError::Collaborator(err.to_string())
    }
}

impl ServiceError {
    pub fn denied(notice: &str, redirect: &str) -> Self {
        ServiceError::Denied { notice: notice.to_string(), redirect: redirect.to_string() }
    }

    fn redirect(&self) -> Option<(NoticeLevel, String)> {
        match self {
            ServiceError::Denied { redirect, .. } => Some((NoticeLevel::Error, redirect.clone())),
            ServiceError::AlreadyEnrolled { course_id } => {
                Some((NoticeLevel::Info, paths::course_content(*course_id)))
            }
            ServiceError::NotFound => Some((NoticeLevel::Warning, paths::home())),
            _ => None,
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Denied { .. } => StatusCode::SEE_OTHER,
            ServiceError::AlreadyEnrolled { .. } => StatusCode::SEE_OTHER,
            ServiceError::NotFound => StatusCode::SEE_OTHER,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::DuplicateCertificate => StatusCode::CONFLICT,
            ServiceError::Duplicate(_) => StatusCode::CONFLICT,
            ServiceError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Collaborator(detail) => tracing::warn!(%detail, "collaborator failure"),
            ServiceError::Internal(detail) => tracing::error!(%detail, "internal error"),
            _ => {}
        }

        if let Some((level, location)) = self.redirect() {
            return HttpResponse::build(self.status_code())
                .insert_header((header::LOCATION, location.clone()))
                .json(Notice { level, message: self.to_string(), redirect: Some(location) });
        }

        HttpResponse::build(self.status_code()).json(CustomError { error: self.to_string() })
    }
}
