use std::collections::BTreeSet;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    errors::{ServiceError, StoreError},
    models::{
        constraint,
        course::{Course, CourseChanges, CourseFilter, Evaluation, Module, NewCourse, NewEvaluation, NewModule},
        user::{Role, User},
    },
    paths,
    schema::course::{CourseDetail, CourseForm, EvaluationForm, ModuleForm},
    services::{commerce, roles::{Principal, PERMISSION_NOTICE}},
    storage::UploadPolicy,
    utils::slugify,
    GlobalState,
};

const MAX_TITLE_LEN: usize = 100;
const SLUG_ATTEMPTS: usize = 3;

fn validate_form(form: &CourseForm) -> Result<(), ServiceError> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("The field `title` is required.".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::Validation(format!(
            "The title must not exceed {MAX_TITLE_LEN} characters."
        )));
    }
    if form.description.trim().is_empty() {
        return Err(ServiceError::Validation("The field `description` is required.".to_string()));
    }
    if form.price < Decimal::ZERO {
        return Err(ServiceError::Validation("The price cannot be negative.".to_string()));
    }
    Ok(())
}

fn material_url(form: &CourseForm) -> Option<String> {
    form.material_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// First free slug among `base`, `base-1`, `base-2`, ...
pub async fn unique_slug(state: &GlobalState, text: &str) -> Result<String, ServiceError> {
    let base = slugify(text);
    if !state.store.slug_exists(&base).await? {
        return Ok(base);
    }

    let mut suffix = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !state.store.slug_exists(&candidate).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

async fn insert_course(state: &GlobalState, instructor_id: i64, form: CourseForm) -> Result<Course, ServiceError> {
    validate_form(&form)?;

    let requested = form.slug.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let mut attempts = 0;
    loop {
        attempts += 1;
        // an explicit slug is taken as given, a derived one is disambiguated
        let slug = match requested {
            Some(slug) => slugify(slug),
            None => unique_slug(state, &form.title).await?,
        };

        let result = state
            .store
            .create_course(NewCourse {
                instructor_id,
                title: form.title.trim().to_string(),
                slug,
                description: form.description.trim().to_string(),
                price: form.price,
                course_type: form.course_type,
                status: form.status,
                material_url: material_url(&form),
            })
            .await;

        match result {
            Ok(course) => {
                tracing::info!(course_id = course.id, slug = %course.slug, instructor_id, "course created");
                return Ok(course);
            }
            Err(e) if requested.is_none() && e.violates(constraint::COURSES_SLUG) && attempts < SLUG_ATTEMPTS => {
                tracing::debug!("slug taken concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn instructor_account(state: &GlobalState, instructor_id: Option<i64>) -> Result<User, ServiceError> {
    let invalid = || ServiceError::Validation("Select a valid instructor.".to_string());
    let id = instructor_id.ok_or_else(invalid)?;
    state
        .store
        .find_user(id)
        .await?
        .filter(|user| user.is_active && user.has_role(Role::Instructor))
        .ok_or_else(invalid)
}

/// Self-service creation: the course belongs to the instructor creating it.
pub async fn create_course(state: &GlobalState, instructor: &User, form: CourseForm) -> Result<Course, ServiceError> {
    insert_course(state, instructor.id, form).await
}

pub async fn admin_create_course(state: &GlobalState, form: CourseForm) -> Result<Course, ServiceError> {
    let instructor = instructor_account(state, form.instructor_id).await?;
    insert_course(state, instructor.id, form).await
}

pub async fn find_course(state: &GlobalState, course_id: i64) -> Result<Course, ServiceError> {
    state.store.find_course(course_id).await?.ok_or(ServiceError::NotFound)
}

/// A course the instructor owns; anyone else's course is a permission denial.
pub async fn owned_course(state: &GlobalState, instructor: &User, course_id: i64) -> Result<Course, ServiceError> {
    let course = find_course(state, course_id).await?;
    if course.instructor_id != instructor.id {
        tracing::info!(course_id, user_id = instructor.id, "course ownership check denied");
        return Err(ServiceError::denied(PERMISSION_NOTICE, &paths::dashboard()));
    }
    Ok(course)
}

fn changes_from(form: CourseForm, instructor_id: i64) -> CourseChanges {
    CourseChanges {
        instructor_id,
        material_url: material_url(&form),
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        price: form.price,
        course_type: form.course_type,
        status: form.status,
    }
}

/// The slug and the owner never change through a self-service edit.
pub async fn edit_course(state: &GlobalState, course: &Course, form: CourseForm) -> Result<Course, ServiceError> {
    validate_form(&form)?;
    let updated = state.store.update_course(course.id, changes_from(form, course.instructor_id)).await?;
    tracing::info!(course_id = updated.id, "course updated");
    Ok(updated)
}

pub async fn admin_edit_course(state: &GlobalState, course_id: i64, form: CourseForm) -> Result<Course, ServiceError> {
    let course = find_course(state, course_id).await?;
    validate_form(&form)?;

    let instructor_id = match form.instructor_id {
        Some(id) if id != course.instructor_id => instructor_account(state, Some(id)).await?.id,
        _ => course.instructor_id,
    };

    let updated = state.store.update_course(course.id, changes_from(form, instructor_id)).await?;
    tracing::info!(course_id = updated.id, instructor_id, "course updated by administrator");
    Ok(updated)
}

async fn remove_asset_logged(state: &GlobalState, path: &str) {
    if let Err(e) = state.assets.remove(path).await {
        tracing::warn!(%path, error = %e, "asset removal failed");
    }
}

/// Removes the course with everything hanging off it, then its document
/// and the PDFs of the certificates issued for it.
pub async fn delete_course(state: &GlobalState, course: Course) -> Result<(), ServiceError> {
    let issued = state.store.list_course_certificates(course.id).await?;
    state.store.delete_course(course.id).await?;
    tracing::info!(course_id = course.id, certificates = issued.len(), "course deleted");

    let assets = course
        .document_path
        .iter()
        .chain(issued.iter().map(|c| &c.document_path));
    for path in assets {
        remove_asset_logged(state, path).await;
    }
    Ok(())
}

pub async fn public_courses(state: &GlobalState) -> Result<Vec<Course>, ServiceError> {
    Ok(state.store.list_courses(CourseFilter { instructor_id: None, active_only: true }).await?)
}

pub async fn all_courses(state: &GlobalState) -> Result<Vec<Course>, ServiceError> {
    Ok(state.store.list_courses(CourseFilter::default()).await?)
}

pub async fn instructor_courses(state: &GlobalState, instructor: &User) -> Result<Vec<Course>, ServiceError> {
    Ok(state
        .store
        .list_courses(CourseFilter { instructor_id: Some(instructor.id), active_only: false })
        .await?)
}

pub async fn course_detail(state: &GlobalState, principal: &Principal, course_id: i64) -> Result<CourseDetail, ServiceError> {
    let course = find_course(state, course_id).await?;
    if !course.is_active() {
        return Err(ServiceError::NotFound);
    }

    let has_access = match principal.user() {
        Some(user) => Some(commerce::has_access(state, user.id, course.id).await?),
        None => None,
    };
    let modules = state.store.list_modules(course.id).await?;

    Ok(CourseDetail { course, modules, has_access })
}

/// Stores a new course document and drops the one it replaces.
pub async fn attach_document(
    state: &GlobalState,
    course: &Course,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<Course, ServiceError> {
    UploadPolicy::PDF_ONLY.check(content_type, bytes)?;

    let path = format!("courses/documents/{}-{}.pdf", course.id, Uuid::new_v4().simple());
    state.assets.save(&path, bytes).await?;

    let updated = match state.store.set_course_document(course.id, Some(path.clone())).await {
        Ok(updated) => updated,
        Err(e) => {
            remove_asset_logged(state, &path).await;
            return Err(e.into());
        }
    };

    if let Some(old) = course.document_path.as_deref() {
        remove_asset_logged(state, old).await;
    }

    tracing::info!(course_id = course.id, %path, "course document attached");
    Ok(updated)
}

pub async fn course_modules(state: &GlobalState, course: &Course) -> Result<Vec<Module>, ServiceError> {
    Ok(state.store.list_modules(course.id).await?)
}

pub async fn module_of(state: &GlobalState, course: &Course, module_id: i64) -> Result<Module, ServiceError> {
    state
        .store
        .find_module(module_id)
        .await?
        .filter(|module| module.course_id == course.id)
        .ok_or(ServiceError::NotFound)
}

pub async fn add_module(state: &GlobalState, course: &Course, form: ModuleForm) -> Result<Module, ServiceError> {
    let title = form.title.trim();
    let content_url = form.content_url.trim();
    if title.is_empty() || content_url.is_empty() {
        return Err(ServiceError::Validation("A module needs a title and a content reference.".to_string()));
    }

    let position = match form.position {
        Some(position) if position < 1 => {
            return Err(ServiceError::Validation("The position must be a positive number.".to_string()))
        }
        Some(position) => position,
        None => {
            let modules = state.store.list_modules(course.id).await?;
            modules.iter().map(|m| m.position).max().unwrap_or(0) + 1
        }
    };

    let module = state
        .store
        .create_module(NewModule {
            course_id: course.id,
            title: title.to_string(),
            content_url: content_url.to_string(),
            position,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => ServiceError::Validation(ServiceError::from(e).to_string()),
            other => other.into(),
        })?;

    tracing::info!(course_id = course.id, module_id = module.id, position, "module added");
    Ok(module)
}

/// `module_ids` must name every module of the course exactly once.
pub async fn reorder_modules(state: &GlobalState, course: &Course, module_ids: &[i64]) -> Result<Vec<Module>, ServiceError> {
    let current: BTreeSet<i64> = state.store.list_modules(course.id).await?.iter().map(|m| m.id).collect();
    let requested: BTreeSet<i64> = module_ids.iter().copied().collect();

    if requested.len() != module_ids.len() || requested != current {
        return Err(ServiceError::Validation(
            "The new order must list every module of the course exactly once.".to_string(),
        ));
    }

    let modules = state.store.reorder_modules(course.id, module_ids).await?;
    tracing::info!(course_id = course.id, "modules reordered");
    Ok(modules)
}

pub async fn delete_module(state: &GlobalState, course: &Course, module_id: i64) -> Result<(), ServiceError> {
    let module = module_of(state, course, module_id).await?;
    state.store.delete_module(module.id).await?;
    tracing::info!(course_id = course.id, module_id, "module deleted");
    Ok(())
}

pub async fn add_evaluation(
    state: &GlobalState,
    course: &Course,
    module_id: i64,
    form: EvaluationForm,
) -> Result<Evaluation, ServiceError> {
    let module = module_of(state, course, module_id).await?;
    let title = form.title.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("The field `title` is required.".to_string()));
    }

    let evaluation = state
        .store
        .create_evaluation(NewEvaluation {
            module_id: module.id,
            title: title.to_string(),
            description: form.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => ServiceError::Validation("This module already has an evaluation.".to_string()),
            other => other.into(),
        })?;

    tracing::info!(module_id, evaluation_id = evaluation.id, "evaluation created");
    Ok(evaluation)
}
