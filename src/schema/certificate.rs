use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct IssueCertificate {
    pub student_id: i64,
    pub course_id: i64,
    #[serde(default)]
    pub template_id: Option<i64>,
}

/// Query string of a template upload; the document itself is the request body.
#[derive(Debug, Deserialize, Serialize)]
pub struct TemplateUpload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CertificateVerification {
    pub code: String,
    pub student_name: String,
    pub course_title: String,
    pub issued_on: NaiveDate,
}
