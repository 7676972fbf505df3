use std::collections::HashMap;

use crate::{
    errors::ServiceError,
    models::{progress::Progress, user::User},
    schema::course::{CourseContent, ModuleProgress, ModuleView},
    services::{catalog, commerce},
    GlobalState,
};

/// Ordered modules of a purchased course with the student's progress on each.
pub async fn content(state: &GlobalState, student: &User, course_id: i64) -> Result<CourseContent, ServiceError> {
    let course = commerce::require_access(state, student, course_id).await?;

    let modules = state.store.list_modules(course.id).await?;
    let progress: HashMap<i64, Progress> = state
        .store
        .list_progress(student.id, course.id)
        .await?
        .into_iter()
        .map(|p| (p.module_id, p))
        .collect();

    let modules: Vec<ModuleProgress> = modules
        .into_iter()
        .map(|module| {
            let entry = progress.get(&module.id);
            ModuleProgress {
                completed: entry.is_some_and(|p| p.completed),
                started: entry.is_some(),
                module,
            }
        })
        .collect();

    let completed_modules = modules.iter().filter(|m| m.completed).count();
    let total_modules = modules.len();

    Ok(CourseContent { course, modules, completed_modules, total_modules })
}

/// Opening a module marks it started; opening it again changes nothing.
pub async fn open_module(state: &GlobalState, student: &User, course_id: i64, module_id: i64) -> Result<ModuleView, ServiceError> {
    let course = commerce::require_access(state, student, course_id).await?;
    let module = catalog::module_of(state, &course, module_id).await?;

    let progress = state.store.start_progress(student.id, module.id).await?;
    let evaluation = state.store.find_evaluation_for_module(module.id).await?;

    tracing::debug!(student_id = student.id, module_id, "module opened");
    Ok(ModuleView { module, evaluation, progress })
}

/// The completion time is stamped once and kept on later calls.
pub async fn complete_module(state: &GlobalState, student: &User, course_id: i64, module_id: i64) -> Result<Progress, ServiceError> {
    let course = commerce::require_access(state, student, course_id).await?;
    let module = catalog::module_of(state, &course, module_id).await?;

    let progress = state.store.complete_progress(student.id, module.id).await?;
    tracing::info!(student_id = student.id, module_id, "module completed");
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{course::NewModule, user::Role, CourseStore},
        services::commerce::enroll,
        test_init_app::{dec, seed_course, seed_user, test_context},
    };

    #[actix_web::test]
    async fn completion_time_is_set_once() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let ana = seed_user(&ctx.state, "ana", "ana@x.com", &[Role::Student]).await;
        let course = seed_course(&ctx.state, &teo, "Rust", dec("10")).await;
        let module = ctx
            .store
            .create_module(NewModule {
                course_id: course.id,
                title: "intro".to_string(),
                content_url: "https://v/1".to_string(),
                position: 1,
            })
            .await
            .unwrap();
        enroll(&ctx.state, &ana, course.id).await.unwrap();

        let first = complete_module(&ctx.state, &ana, course.id, module.id).await.unwrap();
        let second = complete_module(&ctx.state, &ana, course.id, module.id).await.unwrap();

        assert!(first.completed && second.completed);
        assert!(first.completed_at.is_some());
        assert_eq!(first.completed_at, second.completed_at);
        assert_eq!(first.id, second.id);
    }

    #[actix_web::test]
    async fn opening_twice_keeps_one_row() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let ana = seed_user(&ctx.state, "ana", "ana@x.com", &[Role::Student]).await;
        let course = seed_course(&ctx.state, &teo, "Rust", dec("10")).await;
        let mut modules = Vec::new();
        for position in 1..=2 {
            modules.push(
                ctx.store
                    .create_module(NewModule {
                        course_id: course.id,
                        title: format!("m{position}"),
                        content_url: "https://v".to_string(),
                        position,
                    })
                    .await
                    .unwrap(),
            );
        }
        enroll(&ctx.state, &ana, course.id).await.unwrap();

        let first = open_module(&ctx.state, &ana, course.id, modules[0].id).await.unwrap();
        let again = open_module(&ctx.state, &ana, course.id, modules[0].id).await.unwrap();
        assert_eq!(first.progress.id, again.progress.id);
        assert!(!again.progress.completed);

        let (_, _, _, progress_rows, _) = ctx.store.row_counts();
        assert_eq!(progress_rows, 1);

        complete_module(&ctx.state, &ana, course.id, modules[1].id).await.unwrap();
        let view = content(&ctx.state, &ana, course.id).await.unwrap();
        assert_eq!((view.completed_modules, view.total_modules), (1, 2));
        assert!(view.modules[0].started && !view.modules[0].completed);
        assert!(view.modules[1].completed);
    }

    #[actix_web::test]
    async fn modules_need_a_validated_purchase() {
        let ctx = test_context();
        let teo = seed_user(&ctx.state, "teo", "teo@x.com", &[Role::Instructor]).await;
        let ana = seed_user(&ctx.state, "ana", "ana@x.com", &[Role::Student]).await;
        let course = seed_course(&ctx.state, &teo, "Rust", dec("10")).await;
        let other = seed_course(&ctx.state, &teo, "Go", dec("10")).await;
        let foreign = ctx
            .store
            .create_module(NewModule {
                course_id: other.id,
                title: "m".to_string(),
                content_url: "https://v".to_string(),
                position: 1,
            })
            .await
            .unwrap();

        assert!(matches!(content(&ctx.state, &ana, course.id).await, Err(ServiceError::Denied { .. })));

        enroll(&ctx.state, &ana, course.id).await.unwrap();
        // a module of another course is not reachable through this one
        assert!(matches!(
            open_module(&ctx.state, &ana, course.id, foreign.id).await,
            Err(ServiceError::NotFound)
        ));
    }
}
