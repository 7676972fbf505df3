use actix_web::{get, post, web, HttpResponse};

use crate::{
    errors::ServiceError,
    models::user::Role,
    schema::PurchaseResponse,
    services::{
        catalog,
        certification,
        commerce::{self, EnrollOutcome},
        progress,
        roles::{self, Principal},
    },
    GlobalState,
};

#[get("")]
pub async fn list_courses(data: web::Data<GlobalState>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(catalog::public_courses(&data).await?))
}

#[get("/{course_id}")]
pub async fn course_detail(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(catalog::course_detail(&data, &principal, path.into_inner()).await?))
}

#[post("/{course_id}/enroll")]
pub async fn enroll(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    let course_id = path.into_inner();

    match commerce::enroll(&data, student, course_id).await? {
        EnrollOutcome::Enrolled(purchase) => Ok(HttpResponse::Created().json(PurchaseResponse {
            id: purchase.id,
            message: "Purchase completed. Enjoy the course!".to_string(),
            purchase,
        })),
        EnrollOutcome::AlreadyEnrolled => Err(ServiceError::AlreadyEnrolled { course_id }),
    }
}

#[get("/{course_id}/content")]
pub async fn content(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    Ok(HttpResponse::Ok().json(progress::content(&data, student, path.into_inner()).await?))
}

#[get("/{course_id}/modules/{module_id}")]
pub async fn open_module(data: web::Data<GlobalState>, principal: Principal, path: web::Path<(i64, i64)>) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    let (course_id, module_id) = path.into_inner();
    Ok(HttpResponse::Ok().json(progress::open_module(&data, student, course_id, module_id).await?))
}

#[post("/{course_id}/modules/{module_id}/complete")]
pub async fn complete_module(data: web::Data<GlobalState>, principal: Principal, path: web::Path<(i64, i64)>) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    let (course_id, module_id) = path.into_inner();
    Ok(HttpResponse::Ok().json(progress::complete_module(&data, student, course_id, module_id).await?))
}

/// Public lookup of an issued certificate.
#[get("/verify/{code}")]
pub async fn verify_certificate(data: web::Data<GlobalState>, path: web::Path<String>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(certification::verify(&data, &path.into_inner()).await?))
}
