use actix_web::{get, post, web::{self, Json}, HttpResponse};

use crate::{
    errors::ServiceError,
    handlers::pdf_attachment,
    models::user::Role,
    paths,
    schema::{
        user::{PasswordResetConfirm, PasswordResetRequest, RegisterUser, ResetLinkQuery},
        IdentifierAndPassword, Notice, SigninResponse, SignupResponse,
    },
    services::{
        accounts, certification, commerce, dashboards,
        roles::{self, Principal},
    },
    GlobalState,
};

#[post("/register")]
pub async fn register(data: web::Data<GlobalState>, form: Json<RegisterUser>) -> Result<HttpResponse, ServiceError> {
    let user = accounts::register(&data, form.into_inner()).await?;

    Ok(HttpResponse::Created().json(SignupResponse {
        message: String::from("Your account has been created. You can log in now."),
        id: user.id,
    }))
}

#[get("/login")]
pub async fn login_page() -> HttpResponse {
    HttpResponse::Ok().json(Notice::info("Send your username or email and password to log in."))
}

#[post("/login")]
pub async fn login(data: web::Data<GlobalState>, creds: Json<IdentifierAndPassword>) -> Result<HttpResponse, ServiceError> {
    let (user, token) = accounts::login(&data, &creds.identifier, &creds.password).await?;

    Ok(HttpResponse::Ok().json(SigninResponse {
        message: format!("Welcome back, {}!", user.full_name),
        token,
    }))
}

/// Tokens are stateless; the client drops its copy.
#[post("/logout")]
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().json(Notice::success("You have been logged out.").redirect_to(paths::home()))
}

#[post("/password-reset")]
pub async fn request_password_reset(data: web::Data<GlobalState>, form: Json<PasswordResetRequest>) -> Result<HttpResponse, ServiceError> {
    accounts::request_password_reset(&data, &form.email).await?;

    Ok(HttpResponse::Ok().json(Notice::info(accounts::RESET_REQUESTED).redirect_to(paths::login())))
}

#[get("/password-reset/confirm")]
pub async fn password_reset_page(query: web::Query<ResetLinkQuery>) -> Result<HttpResponse, ServiceError> {
    if query.token.trim().is_empty() {
        return Err(ServiceError::Validation(accounts::INVALID_RESET_LINK.to_string()));
    }
    Ok(HttpResponse::Ok().json(Notice::info(
        "Send the token with `password1` and `password2` to choose a new password.",
    )))
}

#[post("/password-reset/confirm")]
pub async fn confirm_password_reset(data: web::Data<GlobalState>, form: Json<PasswordResetConfirm>) -> Result<HttpResponse, ServiceError> {
    accounts::confirm_password_reset(&data, form.into_inner()).await?;

    Ok(HttpResponse::Ok().json(
        Notice::success("Your password has been changed. You can log in now.").redirect_to(paths::login()),
    ))
}

#[get("/dashboard")]
pub async fn dashboard(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    Ok(HttpResponse::Ok().json(dashboards::student(&data, student).await?))
}

#[get("/purchases")]
pub async fn purchases(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    Ok(HttpResponse::Ok().json(commerce::student_purchases(&data, student).await?))
}

#[get("/certificates")]
pub async fn certificates(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    Ok(HttpResponse::Ok().json(certification::student_certificates(&data, student).await?))
}

#[get("/certificates/{id}/download")]
pub async fn download_certificate(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let student = roles::require(&principal, Role::Student)?;
    let (certificate, bytes) = certification::certificate_document(&data, student, path.into_inner()).await?;

    Ok(pdf_attachment(&format!("certificate-{}.pdf", certificate.code), bytes))
}
