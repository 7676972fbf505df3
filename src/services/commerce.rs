use crate::{
    documents::Receipt,
    errors::ServiceError,
    models::{
        constraint,
        course::Course,
        purchase::{NewPurchase, PaymentState, Purchase, PurchaseFilter},
        user::User,
    },
    paths,
    schema::course::PurchaseView,
    services::catalog,
    GlobalState,
};

pub const NO_ACCESS_NOTICE: &str = "You need to purchase this course to see its content.";

#[derive(Debug)]
pub enum EnrollOutcome {
    Enrolled(Purchase),
    AlreadyEnrolled,
}

/// Payments always succeed: a new purchase is stored as validated at the current price.
pub async fn enroll(state: &GlobalState, student: &User, course_id: i64) -> Result<EnrollOutcome, ServiceError> {
    let course = catalog::find_course(state, course_id).await?;
    if !course.is_active() {
        return Err(ServiceError::Validation("This course is not available for purchase.".to_string()));
    }

    if let Some(existing) = state.store.find_purchase_for(student.id, course.id).await? {
        return settle_existing(state, existing).await;
    }

    let created = state
        .store
        .create_purchase(NewPurchase {
            student_id: student.id,
            course_id: course.id,
            amount_paid: course.price,
            state: PaymentState::Validated,
        })
        .await;

    match created {
        Ok(purchase) => {
            tracing::info!(purchase_id = purchase.id, student_id = student.id, course_id, amount = %purchase.amount_paid, "course purchased");
            Ok(EnrollOutcome::Enrolled(purchase))
        }
        // a concurrent request inserted first
        Err(e) if e.violates(constraint::PURCHASES_STUDENT_COURSE) => {
            tracing::info!(student_id = student.id, course_id, "concurrent enrollment resolved as existing");
            Ok(EnrollOutcome::AlreadyEnrolled)
        }
        Err(e) => Err(e.into()),
    }
}

async fn settle_existing(state: &GlobalState, existing: Purchase) -> Result<EnrollOutcome, ServiceError> {
    match existing.state {
        PaymentState::Validated => Ok(EnrollOutcome::AlreadyEnrolled),
        PaymentState::Rejected => Err(ServiceError::Validation(
            "Your previous payment for this course was rejected.".to_string(),
        )),
        PaymentState::Pending => {
            let moved = state
                .store
                .transition_purchase(existing.id, PaymentState::Pending, PaymentState::Validated)
                .await?;
            match moved {
                Some(purchase) => {
                    tracing::info!(purchase_id = purchase.id, "pending purchase validated on enrollment");
                    Ok(EnrollOutcome::Enrolled(purchase))
                }
                // someone settled it meanwhile; look again
                None => match state.store.find_purchase(existing.id).await? {
                    Some(p) if p.is_validated() => Ok(EnrollOutcome::AlreadyEnrolled),
                    Some(_) => Err(ServiceError::Validation(
                        "Your previous payment for this course was rejected.".to_string(),
                    )),
                    None => Err(ServiceError::NotFound),
                },
            }
        }
    }
}

/// Computed on demand, never stored: a validated purchase for the pair.
pub async fn has_access(state: &GlobalState, student_id: i64, course_id: i64) -> Result<bool, ServiceError> {
    Ok(state
        .store
        .find_purchase_for(student_id, course_id)
        .await?
        .is_some_and(|purchase| purchase.is_validated()))
}

/// The course, if the student may see its content. Fails closed.
pub async fn require_access(state: &GlobalState, student: &User, course_id: i64) -> Result<Course, ServiceError> {
    let course = catalog::find_course(state, course_id).await?;
    if !has_access(state, student.id, course.id).await? {
        tracing::info!(student_id = student.id, course_id, "content access denied");
        return Err(ServiceError::denied(NO_ACCESS_NOTICE, &paths::course(course.id)));
    }
    Ok(course)
}

pub async fn transition(state: &GlobalState, purchase_id: i64, to: PaymentState) -> Result<Purchase, ServiceError> {
    let purchase = state.store.find_purchase(purchase_id).await?.ok_or(ServiceError::NotFound)?;

    if !purchase.state.can_transition_to(to) {
        return Err(ServiceError::Validation(
            "Only pending purchases can be validated or rejected.".to_string(),
        ));
    }

    let moved = state
        .store
        .transition_purchase(purchase.id, purchase.state, to)
        .await?
        .ok_or_else(|| ServiceError::Validation("This purchase was already settled.".to_string()))?;

    tracing::info!(purchase_id, from = ?purchase.state, to = ?moved.state, "purchase transitioned");
    Ok(moved)
}

async fn view_of(state: &GlobalState, purchase: Purchase) -> Result<PurchaseView, ServiceError> {
    let student = state.store.find_user(purchase.student_id).await?.ok_or(ServiceError::NotFound)?;
    let course = state.store.find_course(purchase.course_id).await?.ok_or(ServiceError::NotFound)?;

    Ok(PurchaseView {
        purchase,
        student_name: student.full_name,
        student_email: student.email,
        course_title: course.title,
    })
}

pub async fn purchase_views(state: &GlobalState, filter: PurchaseFilter) -> Result<Vec<PurchaseView>, ServiceError> {
    let purchases = state.store.list_purchases(filter).await?;

    let mut views = Vec::with_capacity(purchases.len());
    for purchase in purchases {
        views.push(view_of(state, purchase).await?);
    }
    Ok(views)
}

pub async fn student_purchases(state: &GlobalState, student: &User) -> Result<Vec<PurchaseView>, ServiceError> {
    purchase_views(state, PurchaseFilter { student_id: Some(student.id), ..Default::default() }).await
}

/// Renders the PDF receipt of a purchase.
pub async fn receipt(state: &GlobalState, purchase_id: i64) -> Result<Vec<u8>, ServiceError> {
    let purchase = state.store.find_purchase(purchase_id).await?.ok_or(ServiceError::NotFound)?;
    let view = view_of(state, purchase).await?;

    let receipt = Receipt {
        purchase_id: view.purchase.id,
        purchased_at: view.purchase.purchased_at,
        student_name: view.student_name,
        student_email: view.student_email,
        course_title: view.course_title,
        amount: view.purchase.amount_paid,
    };

    let bytes = state.renderer.render_receipt(&receipt)?;
    tracing::info!(purchase_id, size = bytes.len(), "receipt rendered");
    Ok(bytes)
}
