use actix_web::{delete, get, post, put, web::{self, Json}, HttpRequest, HttpResponse};

use crate::{
    errors::ServiceError,
    handlers::content_type,
    models::user::Role,
    schema::{
        course::{CourseForm, EvaluationForm, ModuleForm, ReorderModules},
        Notice,
    },
    services::{
        catalog, dashboards,
        roles::{self, Principal},
    },
    GlobalState,
};

#[get("/dashboard")]
pub async fn dashboard(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    Ok(HttpResponse::Ok().json(dashboards::instructor(&data, instructor).await?))
}

#[get("/courses")]
pub async fn list_courses(data: web::Data<GlobalState>, principal: Principal) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    Ok(HttpResponse::Ok().json(catalog::instructor_courses(&data, instructor).await?))
}

#[post("/courses")]
pub async fn create_course(data: web::Data<GlobalState>, principal: Principal, form: Json<CourseForm>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    Ok(HttpResponse::Created().json(catalog::create_course(&data, instructor, form.into_inner()).await?))
}

#[put("/courses/{course_id}")]
pub async fn update_course(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>, form: Json<CourseForm>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let course = catalog::owned_course(&data, instructor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(catalog::edit_course(&data, &course, form.into_inner()).await?))
}

#[delete("/courses/{course_id}")]
pub async fn delete_course(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let course = catalog::owned_course(&data, instructor, path.into_inner()).await?;
    catalog::delete_course(&data, course).await?;
    Ok(HttpResponse::Ok().json(Notice::success("The course has been deleted.")))
}

/// The PDF is the raw request body.
#[put("/courses/{course_id}/document")]
pub async fn upload_document(
    data: web::Data<GlobalState>,
    principal: Principal,
    path: web::Path<i64>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let course = catalog::owned_course(&data, instructor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(catalog::attach_document(&data, &course, content_type(&req), &body).await?))
}

#[get("/courses/{course_id}/modules")]
pub async fn list_modules(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let course = catalog::owned_course(&data, instructor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(catalog::course_modules(&data, &course).await?))
}

#[post("/courses/{course_id}/modules")]
pub async fn add_module(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>, form: Json<ModuleForm>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let course = catalog::owned_course(&data, instructor, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(catalog::add_module(&data, &course, form.into_inner()).await?))
}

#[put("/courses/{course_id}/modules/order")]
pub async fn reorder_modules(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>, form: Json<ReorderModules>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let course = catalog::owned_course(&data, instructor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(catalog::reorder_modules(&data, &course, &form.module_ids).await?))
}

#[delete("/courses/{course_id}/modules/{module_id}")]
pub async fn delete_module(data: web::Data<GlobalState>, principal: Principal, path: web::Path<(i64, i64)>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let (course_id, module_id) = path.into_inner();
    let course = catalog::owned_course(&data, instructor, course_id).await?;
    catalog::delete_module(&data, &course, module_id).await?;
    Ok(HttpResponse::Ok().json(Notice::success("The module has been deleted.")))
}

#[post("/courses/{course_id}/modules/{module_id}/evaluation")]
pub async fn add_evaluation(data: web::Data<GlobalState>, principal: Principal, path: web::Path<(i64, i64)>, form: Json<EvaluationForm>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    let (course_id, module_id) = path.into_inner();
    let course = catalog::owned_course(&data, instructor, course_id).await?;
    Ok(HttpResponse::Created().json(catalog::add_evaluation(&data, &course, module_id, form.into_inner()).await?))
}

#[get("/courses/{course_id}/students")]
pub async fn roster(data: web::Data<GlobalState>, principal: Principal, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let instructor = roles::require(&principal, Role::Instructor)?;
    Ok(HttpResponse::Ok().json(dashboards::roster(&data, instructor, path.into_inner()).await?))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{header, StatusCode}, test};
    use serde_json::{json, Value};

    use crate::{
        models::{course::{Course, Module}, user::Role},
        schema::dashboard::{InstructorDashboard, RosterEntry},
        services::commerce,
        test_init_app::{bearer, dec, init, seed_course, seed_user, test_context},
    };

    fn course_json(title: &str) -> Value {
        json!({
            "title": title,
            "description": "Ownership and borrowing",
            "price": "19.90",
            "course_type": "recorded"
        })
    }

    #[actix_web::test]
    async fn test_instructor_course_lifecycle() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let app = init(ctx.state.clone()).await;

        let res = test::TestRequest::post()
            .uri("/api/v1/instructor/courses")
            .insert_header(bearer(&ctx.state, &teo))
            .set_json(course_json("Rust Basics"))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let course: Course = test::read_body_json(res).await;
        assert_eq!(course.slug, "rust-basics");
        assert_eq!(course.instructor_id, teo.id);

        let res = test::TestRequest::put()
            .uri(&format!("/api/v1/instructor/courses/{}", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .set_json(course_json("Rust Fundamentals"))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let edited: Course = test::read_body_json(res).await;
        assert_eq!(edited.title, "Rust Fundamentals");
        assert_eq!(edited.slug, "rust-basics");

        for title in ["one", "two"] {
            let res = test::TestRequest::post()
                .uri(&format!("/api/v1/instructor/courses/{}/modules", course.id))
                .insert_header(bearer(&ctx.state, &teo))
                .set_json(json!({"title": title, "content_url": "https://v"}))
                .send_request(&app)
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = test::TestRequest::get()
            .uri(&format!("/api/v1/instructor/courses/{}/modules", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .send_request(&app)
            .await;
        let modules: Vec<Module> = test::read_body_json(res).await;
        let reversed: Vec<i64> = modules.iter().rev().map(|m| m.id).collect();

        let res = test::TestRequest::put()
            .uri(&format!("/api/v1/instructor/courses/{}/modules/order", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .set_json(json!({ "module_ids": reversed }))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let reordered: Vec<Module> = test::read_body_json(res).await;
        assert_eq!(reordered[0].title, "two");

        let res = test::TestRequest::post()
            .uri(&format!("/api/v1/instructor/courses/{}/modules/{}/evaluation", course.id, reordered[0].id))
            .insert_header(bearer(&ctx.state, &teo))
            .set_json(json!({"title": "Quiz"}))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = test::TestRequest::delete()
            .uri(&format!("/api/v1/instructor/courses/{}", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let (modules, evaluations, _, _, _) = ctx.store.row_counts();
        assert_eq!((modules, evaluations), (0, 0));
    }

    #[actix_web::test]
    async fn test_other_instructors_course_is_denied() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let eva = seed_user(&ctx.state, "eva", "eva@x.com", &[Role::Instructor]).await;
        let admin = seed_user(&ctx.state, "root", "root@x.com", &[Role::Admin]).await;
        let course = seed_course(&ctx.state, &teo, "Rust", dec("10")).await;
        let app = init(ctx.state.clone()).await;

        let res = test::TestRequest::delete()
            .uri(&format!("/api/v1/instructor/courses/{}", course.id))
            .insert_header(bearer(&ctx.state, &eva))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/api/v1/user/dashboard");

        // administrators are not instructors
        let res = test::TestRequest::get()
            .uri("/api/v1/instructor/dashboard")
            .insert_header(bearer(&ctx.state, &admin))
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/api/v1/");
    }

    #[actix_web::test]
    async fn test_document_upload() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let course = seed_course(&ctx.state, &teo, "Rust", dec("10")).await;
        let app = init(ctx.state.clone()).await;

        let res = test::TestRequest::put()
            .uri(&format!("/api/v1/instructor/courses/{}/document", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload("not a pdf")
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let mut big = b"%PDF-1.4\n".to_vec();
        big.resize(5 * 1024 * 1024 + 10, b' ');
        let res = test::TestRequest::put()
            .uri(&format!("/api/v1/instructor/courses/{}/document", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .insert_header((header::CONTENT_TYPE, "application/pdf"))
            .set_payload(big)
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "The file must not exceed 5 MB.");

        let res = test::TestRequest::put()
            .uri(&format!("/api/v1/instructor/courses/{}/document", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .insert_header((header::CONTENT_TYPE, "application/pdf"))
            .set_payload(&b"%PDF-1.4 syllabus"[..])
            .send_request(&app)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let updated: Course = test::read_body_json(res).await;
        assert!(ctx.assets.contains(&updated.document_path.unwrap()));
    }

    #[actix_web::test]
    async fn test_dashboard_and_roster() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let ana = seed_user(&ctx.state, "ana", "ana@x.com", &[Role::Student]).await;
        let course = seed_course(&ctx.state, &teo, "Rust", dec("10")).await;
        commerce::enroll(&ctx.state, &ana, course.id).await.unwrap();
        let app = init(ctx.state.clone()).await;

        let res = test::TestRequest::get()
            .uri("/api/v1/instructor/dashboard")
            .insert_header(bearer(&ctx.state, &teo))
            .send_request(&app)
            .await;
        let dashboard: InstructorDashboard = test::read_body_json(res).await;
        assert_eq!((dashboard.total_courses, dashboard.total_students), (1, 1));
        assert_eq!(dashboard.total_revenue, dec("10"));

        let res = test::TestRequest::get()
            .uri(&format!("/api/v1/instructor/courses/{}/students", course.id))
            .insert_header(bearer(&ctx.state, &teo))
            .send_request(&app)
            .await;
        let roster: Vec<RosterEntry> = test::read_body_json(res).await;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].email, "ana@x.com");
    }
}
