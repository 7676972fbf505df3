//! Locations used as redirect targets.

pub const API_PREFIX: &str = "/api/v1";

pub fn home() -> String {
    format!("{API_PREFIX}/")
}

pub fn login() -> String {
    format!("{API_PREFIX}/user/login")
}

pub fn course(course_id: i64) -> String {
    format!("{API_PREFIX}/courses/{course_id}")
}

pub fn course_content(course_id: i64) -> String {
    format!("{API_PREFIX}/courses/{course_id}/content")
}

pub fn dashboard() -> String {
    format!("{API_PREFIX}/user/dashboard")
}
