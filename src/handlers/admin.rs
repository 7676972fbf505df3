use actix_web::{delete, get, post, put, web::{self, Json}, HttpRequest, HttpResponse};

use crate::{
    errors::ServiceError,
    handlers::{content_type, pdf_attachment},
    models::{purchase::PurchaseFilter, user::Role},
    schema::{
        certificate::{IssueCertificate, TemplateUpload},
        course::{CourseForm, PurchaseQuery, TransitionPurchase},
        user::{CreateUser, UpdateUser},
        Notice,
    },
    services::{
        accounts, catalog, certification, commerce, dashboards,
        roles::{self, Principal},
    },
    GlobalState,
};

#[get("/dashboard")]
pub async fn dashboard(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(dashboards::admin(&data).await?))
}

#[get("/users")]
pub async fn list_users(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(accounts::list_users(&data).await?))
}

#[post("/users")]
pub async fn create_user(data: web::Data<GlobalState>, principal: Principal, form: Json<CreateUser>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Created().json(accounts::create_user(&data, form.into_inner()).await?))
}

#[put("/users/{user_id}")]
pub async fn update_user(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>, form: Json<UpdateUser>) -> Result<HttpResponse, ServiceError> {
    let admin = roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(accounts::update_user(&data, admin, path.into_inner(), form.into_inner()).await?))
}

#[post("/users/{user_id}/deactivate")]
pub async fn deactivate_user(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let admin = roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(accounts::deactivate_user(&data, admin, path.into_inner()).await?))
}

#[get("/courses")]
pub async fn list_courses(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(catalog::all_courses(&data).await?))
}

#[post("/courses")]
pub async fn create_course(data: web::Data<GlobalState>, principal: Principal, form: Json<CourseForm>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Created().json(catalog::admin_create_course(&data, form.into_inner()).await?))
}

#[put("/courses/{course_id}")]
pub async fn update_course(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>, form: Json<CourseForm>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(catalog::admin_edit_course(&data, path.into_inner(), form.into_inner()).await?))
}

#[delete("/courses/{course_id}")]
pub async fn delete_course(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    let course = catalog::find_course(&data, path.into_inner()).await?;
    catalog::delete_course(&data, course).await?;
    Ok(HttpResponse::Ok().json(Notice::success("The course has been deleted.")))
}

#[get("/purchases")]
pub async fn list_purchases(data: web::Data<GlobalState>, principal: Principal, query: web::Query<PurchaseQuery>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    let filter = PurchaseFilter { state: query.state, ..Default::default() };
    Ok(HttpResponse::Ok().json(commerce::purchase_views(&data, filter).await?))
}

#[post("/purchases/{purchase_id}/state")]
pub async fn transition_purchase(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>, form: Json<TransitionPurchase>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(commerce::transition(&data, path.into_inner(), form.state).await?))
}

#[get("/purchases/{purchase_id}/receipt")]
pub async fn download_receipt(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    let purchase_id = path.into_inner();
    let bytes = commerce::receipt(&data, purchase_id).await?;
    Ok(pdf_attachment(&format!("receipt-{purchase_id}.pdf"), bytes))
}

#[get("/certificates")]
pub async fn list_certificates(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Ok().json(certification::all_certificates(&data).await?))
}

#[post("/certificates")]
pub async fn issue_certificate(data: web::Data<GlobalState>, principal: Principal, form: Json<IssueCertificate>) -> Result<HttpResponse, ServiceError> {
    roles::require(&principal, Role::Admin)?;
    Ok(HttpResponse::Created().json(certification::issue(&data, form.into_inner()).await?))
}

#[get("/templates")]
pub async fn list_templates(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    roles::require_template_manager(&principal)?;
    Ok(HttpResponse::Ok().json(certification::list_templates(&data).await?))
}

/// Name and description come in the query string, the PDF is the body.
#[post("/templates")]
pub async fn upload_template(
    data: web::Data<GlobalState>,
    principal: Principal,
    query: web::Query<TemplateUpload>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    roles::require_template_manager(&principal)?;
    let template = certification::upload_template(&data, query.into_inner(), content_type(&req), &body).await?;
    Ok(HttpResponse::Created().json(template))
}

#[delete("/templates/{template_id}")]
pub async fn delete_template(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    roles::require_template_manager(&principal)?;
    certification::delete_template(&data, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Notice::success("The template has been deleted.")))
}
