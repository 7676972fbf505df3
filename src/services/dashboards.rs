use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::{
    errors::ServiceError,
    models::{
        course::CourseFilter,
        purchase::{PaymentState, Purchase, PurchaseFilter},
        user::User,
    },
    schema::dashboard::{
        AdminDashboard, CourseStats, InstructorDashboard, PurchasedCourse, RosterEntry, StudentDashboard,
    },
    services::catalog,
    GlobalState,
};

fn validated_for(course_id: i64) -> PurchaseFilter {
    PurchaseFilter { course_id: Some(course_id), state: Some(PaymentState::Validated), ..Default::default() }
}

fn revenue(purchases: &[Purchase]) -> Decimal {
    purchases.iter().map(|p| p.amount_paid).sum()
}

pub async fn student(state: &GlobalState, student: &User) -> Result<StudentDashboard, ServiceError> {
    let purchases = state
        .store
        .list_purchases(PurchaseFilter { student_id: Some(student.id), ..Default::default() })
        .await?;

    let mut entries = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        let Some(course) = state.store.find_course(purchase.course_id).await? else {
            continue;
        };
        let total_modules = state.store.list_modules(course.id).await?.len();
        let completed_modules = state
            .store
            .list_progress(student.id, course.id)
            .await?
            .iter()
            .filter(|p| p.completed)
            .count();

        entries.push(PurchasedCourse { purchase, course_title: course.title, completed_modules, total_modules });
    }

    let certificates = state.store.list_certificates(Some(student.id)).await?;
    Ok(StudentDashboard { purchases: entries, certificates })
}

/// Own courses with validated enrollments and revenue, plus totals.
pub async fn instructor(state: &GlobalState, instructor: &User) -> Result<InstructorDashboard, ServiceError> {
    let courses = state
        .store
        .list_courses(CourseFilter { instructor_id: Some(instructor.id), active_only: false })
        .await?;

    let mut students = HashSet::new();
    let mut total_revenue = Decimal::ZERO;
    let mut stats = Vec::with_capacity(courses.len());

    for course in courses {
        let purchases = state.store.list_purchases(validated_for(course.id)).await?;
        let course_revenue = revenue(&purchases);

        students.extend(purchases.iter().map(|p| p.student_id));
        total_revenue += course_revenue;
        stats.push(CourseStats { course, students: purchases.len(), revenue: course_revenue });
    }

    Ok(InstructorDashboard {
        total_courses: stats.len(),
        total_students: students.len(),
        total_revenue,
        courses: stats,
    })
}

pub async fn roster(state: &GlobalState, instructor: &User, course_id: i64) -> Result<Vec<RosterEntry>, ServiceError> {
    let course = catalog::owned_course(state, instructor, course_id).await?;
    let purchases = state.store.list_purchases(validated_for(course.id)).await?;

    let mut entries = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        let Some(student) = state.store.find_user(purchase.student_id).await? else {
            continue;
        };
        entries.push(RosterEntry {
            student_id: student.id,
            full_name: student.full_name,
            email: student.email,
            purchased_at: purchase.purchased_at,
            amount_paid: purchase.amount_paid,
        });
    }
    Ok(entries)
}

pub async fn admin(state: &GlobalState) -> Result<AdminDashboard, ServiceError> {
    let users = state.store.list_users().await?.len();
    let courses = state.store.list_courses(CourseFilter::default()).await?.len();
    let purchases = state.store.list_purchases(PurchaseFilter::default()).await?;
    let certificates = state.store.list_certificates(None).await?.len();

    let validated: Vec<Purchase> = purchases.iter().filter(|p| p.is_validated()).cloned().collect();

    Ok(AdminDashboard {
        users,
        courses,
        purchases: purchases.len(),
        certificates,
        revenue: revenue(&validated),
    })
}
