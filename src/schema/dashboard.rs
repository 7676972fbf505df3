use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{certificate::Certificate, course::Course, purchase::Purchase};

#[derive(Debug, Serialize, Deserialize)]
pub struct PurchasedCourse {
    pub purchase: Purchase,
    pub course_title: String,
    pub completed_modules: usize,
    pub total_modules: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentDashboard {
    pub purchases: Vec<PurchasedCourse>,
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseStats {
    pub course: Course,
    pub students: usize,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstructorDashboard {
    pub courses: Vec<CourseStats>,
    pub total_courses: usize,
    pub total_students: usize,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterEntry {
    pub student_id: i64,
    pub full_name: String,
    pub email: String,
    pub purchased_at: DateTime<Utc>,
    pub amount_paid: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub users: usize,
    pub courses: usize,
    pub purchases: usize,
    pub certificates: usize,
    pub revenue: Decimal,
}
