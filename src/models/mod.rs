use sqlx::{Pool, Postgres};

pub mod user;
pub mod course;
pub mod purchase;
pub mod progress;
pub mod certificate;

pub use certificate::CertificateStore;
pub use course::CourseStore;
pub use progress::ProgressStore;
pub use purchase::PurchaseStore;
pub use user::UserStore;

/// Names of the unique constraints declared in `migrations/`.
pub mod constraint {
    pub const USERS_USERNAME: &str = "users_username_key";
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const COURSES_SLUG: &str = "courses_slug_key";
    pub const MODULES_COURSE_POSITION: &str = "modules_course_position_key";
    pub const EVALUATIONS_MODULE: &str = "evaluations_module_key";
    pub const PURCHASES_STUDENT_COURSE: &str = "purchases_student_course_key";
    pub const PROGRESS_STUDENT_MODULE: &str = "progress_student_module_key";
    pub const CERTIFICATES_STUDENT_COURSE: &str = "certificates_student_course_key";
    pub const CERTIFICATES_CODE: &str = "certificates_code_key";
}

pub trait Store: UserStore + CourseStore + PurchaseStore + ProgressStore + CertificateStore {}

impl<T> Store for T where T: UserStore + CourseStore + PurchaseStore + ProgressStore + CertificateStore {}

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgStore { pool }
    }
}
