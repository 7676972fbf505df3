pub mod admin;
pub mod user;
pub mod course;
pub mod instructor;

use actix_web::{get, middleware::from_fn, web, HttpRequest, HttpResponse, Responder};

use crate::{errors::ServiceError, middlewares, paths::API_PREFIX, schema::Notice};

/// Request bodies above this are refused before the upload checks run.
pub const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

#[get("/")]
pub async fn home() -> impl Responder {
    HttpResponse::Ok().json(Notice::info("Welcome to Conecta Saber. Browse the catalog at /api/v1/courses."))
}

/// Unknown routes land back on the home page.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    tracing::debug!(path = %req.path(), "no route matched");
    Err(ServiceError::NotFound)
}

pub(crate) fn content_type(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

pub(crate) fn pdf_attachment(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            actix_web::http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(bytes)
}

/// Routes shared by the server and the test app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(API_PREFIX)
            .wrap(from_fn(middlewares::auth::authenticate))
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .service(home)
            .service(
                web::scope("/user")
                    .service(user::register)
                    .service(user::login_page)
                    .service(user::login)
                    .service(user::logout)
                    .service(user::request_password_reset)
                    .service(user::password_reset_page)
                    .service(user::confirm_password_reset)
                    .service(user::dashboard)
                    .service(user::purchases)
                    .service(user::certificates)
                    .service(user::download_certificate),
            )
            .service(
                web::scope("/courses")
                    .service(course::list_courses)
                    .service(course::course_detail)
                    .service(course::enroll)
                    .service(course::content)
                    .service(course::open_module)
                    .service(course::complete_module),
            )
            .service(web::scope("/certificates").service(course::verify_certificate))
            .service(
                web::scope("/instructor")
                    .service(instructor::dashboard)
                    .service(instructor::list_courses)
                    .service(instructor::create_course)
                    .service(instructor::update_course)
                    .service(instructor::delete_course)
                    .service(instructor::upload_document)
                    .service(instructor::list_modules)
                    .service(instructor::add_module)
                    .service(instructor::reorder_modules)
                    .service(instructor::delete_module)
                    .service(instructor::add_evaluation)
                    .service(instructor::roster),
            )
            .service(
                web::scope("/admin")
                    .service(admin::dashboard)
                    .service(admin::list_users)
                    .service(admin::create_user)
                    .service(admin::update_user)
                    .service(admin::deactivate_user)
                    .service(admin::list_courses)
                    .service(admin::create_course)
                    .service(admin::update_course)
                    .service(admin::delete_course)
                    .service(admin::list_purchases)
                    .service(admin::transition_purchase)
                    .service(admin::download_receipt)
                    .service(admin::list_certificates)
                    .service(admin::issue_certificate)
                    .service(admin::list_templates)
                    .service(admin::upload_template)
                    .service(admin::delete_template),
            ),
    );
}
