use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    course::{Course, CourseStatus, CourseType, Evaluation, Module},
    progress::Progress,
    purchase::{PaymentState, Purchase},
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourseForm {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub course_type: CourseType,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub material_url: Option<String>,
    /// Only honoured on creation.
    #[serde(default)]
    pub slug: Option<String>,
    /// Administrator forms only.
    #[serde(default)]
    pub instructor_id: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ModuleForm {
    pub title: String,
    pub content_url: String,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReorderModules {
    pub module_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EvaluationForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseDetail {
    pub course: Course,
    pub modules: Vec<Module>,
    /// `None` for anonymous visitors.
    pub has_access: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub module: Module,
    pub completed: bool,
    pub started: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseContent {
    pub course: Course,
    pub modules: Vec<ModuleProgress>,
    pub completed_modules: usize,
    pub total_modules: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModuleView {
    pub module: Module,
    pub evaluation: Option<Evaluation>,
    pub progress: Progress,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PurchaseQuery {
    #[serde(default)]
    pub state: Option<PaymentState>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransitionPurchase {
    pub state: PaymentState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchaseView {
    pub purchase: Purchase,
    pub student_name: String,
    pub student_email: String,
    pub course_title: String,
}
