use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    errors::StoreError,
    models::{
        certificate::{Certificate, CertificateStore, CertificateTemplate, NewCertificate, NewTemplate},
        constraint,
        course::{
            Course, CourseChanges, CourseFilter, CourseStore, Evaluation, Module, NewCourse,
            NewEvaluation, NewModule,
        },
        progress::{Progress, ProgressStore},
        purchase::{NewPurchase, PaymentState, Purchase, PurchaseFilter, PurchaseStore},
        user::{NewUser, User, UserChanges, UserStore},
    },
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: Vec<User>,
    courses: Vec<Course>,
    modules: Vec<Module>,
    evaluations: Vec<Evaluation>,
    purchases: Vec<Purchase>,
    progress: Vec<Progress>,
    certificates: Vec<Certificate>,
    templates: Vec<CertificateTemplate>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

fn unique(name: &str) -> StoreError {
    StoreError::UniqueViolation(name.to_string())
}

fn insert_purchase(t: &mut Tables, purchase: NewPurchase) -> Result<Purchase, StoreError> {
    if t.purchases.iter().any(|p| p.student_id == purchase.student_id && p.course_id == purchase.course_id) {
        return Err(unique(constraint::PURCHASES_STUDENT_COURSE));
    }
    let created = Purchase {
        id: t.next_id(),
        student_id: purchase.student_id,
        course_id: purchase.course_id,
        amount_paid: purchase.amount_paid,
        state: purchase.state,
        purchased_at: Utc::now(),
    };
    t.purchases.push(created.clone());
    Ok(created)
}

/// Store with the same constraints and cascades as the Postgres schema, kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    interleaved_purchase: Mutex<Option<NewPurchase>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// The next `create_purchase` stores `purchase` first, as a request that
    /// committed between the caller's lookup and its insert would have.
    pub fn interleave_purchase(&self, purchase: NewPurchase) {
        *self.interleaved_purchase.lock().unwrap() = Some(purchase);
    }

    pub fn row_counts(&self) -> (usize, usize, usize, usize, usize) {
        let t = self.lock();
        (t.modules.len(), t.evaluations.len(), t.purchases.len(), t.progress.len(), t.certificates.len())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(unique(constraint::USERS_USERNAME));
        }
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(unique(constraint::USERS_EMAIL));
        }
        let created = User {
            id: t.next_id(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            roles: user.roles,
            is_superuser: user.is_superuser,
            is_active: true,
            date_joined: Utc::now(),
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.lock().users.clone();
        users.reverse();
        Ok(users)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.id != id && u.email == changes.email) {
            return Err(unique(constraint::USERS_EMAIL));
        }
        let user = t.users.iter_mut().find(|u| u.id == id).ok_or(StoreError::NotFound)?;
        user.email = changes.email;
        user.full_name = changes.full_name;
        user.roles = changes.roles;
        user.is_superuser = changes.is_superuser;
        user.is_active = changes.is_active;
        Ok(user.clone())
    }

    async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let mut t = self.lock();
        let user = t.users.iter_mut().find(|u| u.id == id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn slug_exists(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.lock().courses.iter().any(|c| c.slug == slug))
    }

    async fn create_course(&self, course: NewCourse) -> Result<Course, StoreError> {
        let mut t = self.lock();
        if t.courses.iter().any(|c| c.slug == course.slug) {
            return Err(unique(constraint::COURSES_SLUG));
        }
        let now = Utc::now();
        let created = Course {
            id: t.next_id(),
            instructor_id: course.instructor_id,
            title: course.title,
            slug: course.slug,
            description: course.description,
            price: course.price,
            course_type: course.course_type,
            status: course.status,
            material_url: course.material_url,
            document_path: None,
            created_at: now,
            updated_at: now,
        };
        t.courses.push(created.clone());
        Ok(created)
    }

    async fn find_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        Ok(self.lock().courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self, filter: CourseFilter) -> Result<Vec<Course>, StoreError> {
        let mut courses: Vec<Course> = self
            .lock()
            .courses
            .iter()
            .filter(|c| filter.instructor_id.map_or(true, |id| c.instructor_id == id))
            .filter(|c| !filter.active_only || c.is_active())
            .cloned()
            .collect();
        courses.reverse();
        Ok(courses)
    }

    async fn update_course(&self, id: i64, changes: CourseChanges) -> Result<Course, StoreError> {
        let mut t = self.lock();
        let course = t.courses.iter_mut().find(|c| c.id == id).ok_or(StoreError::NotFound)?;
        course.instructor_id = changes.instructor_id;
        course.title = changes.title;
        course.description = changes.description;
        course.price = changes.price;
        course.course_type = changes.course_type;
        course.status = changes.status;
        course.material_url = changes.material_url;
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn set_course_document(&self, id: i64, document_path: Option<String>) -> Result<Course, StoreError> {
        let mut t = self.lock();
        let course = t.courses.iter_mut().find(|c| c.id == id).ok_or(StoreError::NotFound)?;
        course.document_path = document_path;
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn delete_course(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.lock();
        if !t.courses.iter().any(|c| c.id == id) {
            return Err(StoreError::NotFound);
        }
        let module_ids: Vec<i64> = t.modules.iter().filter(|m| m.course_id == id).map(|m| m.id).collect();
        t.evaluations.retain(|e| !module_ids.contains(&e.module_id));
        t.progress.retain(|p| !module_ids.contains(&p.module_id));
        t.modules.retain(|m| m.course_id != id);
        t.purchases.retain(|p| p.course_id != id);
        t.certificates.retain(|c| c.course_id != id);
        t.courses.retain(|c| c.id != id);
        Ok(())
    }

    async fn create_module(&self, module: NewModule) -> Result<Module, StoreError> {
        let mut t = self.lock();
        if t.modules.iter().any(|m| m.course_id == module.course_id && m.position == module.position) {
            return Err(unique(constraint::MODULES_COURSE_POSITION));
        }
        let created = Module {
            id: t.next_id(),
            course_id: module.course_id,
            title: module.title,
            content_url: module.content_url,
            position: module.position,
            created_at: Utc::now(),
        };
        t.modules.push(created.clone());
        Ok(created)
    }

    async fn find_module(&self, id: i64) -> Result<Option<Module>, StoreError> {
        Ok(self.lock().modules.iter().find(|m| m.id == id).cloned())
    }

    async fn list_modules(&self, course_id: i64) -> Result<Vec<Module>, StoreError> {
        let mut modules: Vec<Module> =
            self.lock().modules.iter().filter(|m| m.course_id == course_id).cloned().collect();
        modules.sort_by_key(|m| m.position);
        Ok(modules)
    }

    async fn reorder_modules(&self, course_id: i64, ordered_ids: &[i64]) -> Result<Vec<Module>, StoreError> {
        {
            let mut t = self.lock();
            let owned = ordered_ids
                .iter()
                .all(|id| t.modules.iter().any(|m| m.id == *id && m.course_id == course_id));
            if !owned {
                return Err(StoreError::NotFound);
            }
            for (index, id) in ordered_ids.iter().enumerate() {
                if let Some(module) = t.modules.iter_mut().find(|m| m.id == *id) {
                    module.position = index as i32 + 1;
                }
            }
        }
        self.list_modules(course_id).await
    }

    async fn delete_module(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.lock();
        if !t.modules.iter().any(|m| m.id == id) {
            return Err(StoreError::NotFound);
        }
        t.evaluations.retain(|e| e.module_id != id);
        t.progress.retain(|p| p.module_id != id);
        t.modules.retain(|m| m.id != id);
        Ok(())
    }

    async fn create_evaluation(&self, evaluation: NewEvaluation) -> Result<Evaluation, StoreError> {
        let mut t = self.lock();
        if t.evaluations.iter().any(|e| e.module_id == evaluation.module_id) {
            return Err(unique(constraint::EVALUATIONS_MODULE));
        }
        let created = Evaluation {
            id: t.next_id(),
            module_id: evaluation.module_id,
            title: evaluation.title,
            description: evaluation.description,
            created_at: Utc::now(),
        };
        t.evaluations.push(created.clone());
        Ok(created)
    }

    async fn find_evaluation_for_module(&self, module_id: i64) -> Result<Option<Evaluation>, StoreError> {
        Ok(self.lock().evaluations.iter().find(|e| e.module_id == module_id).cloned())
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, StoreError> {
        let mut t = self.lock();
        if let Some(earlier) = self.interleaved_purchase.lock().unwrap().take() {
            insert_purchase(&mut t, earlier)?;
        }
        insert_purchase(&mut t, purchase)
    }

    async fn find_purchase(&self, id: i64) -> Result<Option<Purchase>, StoreError> {
        Ok(self.lock().purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn find_purchase_for(&self, student_id: i64, course_id: i64) -> Result<Option<Purchase>, StoreError> {
        Ok(self
            .lock()
            .purchases
            .iter()
            .find(|p| p.student_id == student_id && p.course_id == course_id)
            .cloned())
    }

    async fn list_purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError> {
        let mut purchases: Vec<Purchase> = self
            .lock()
            .purchases
            .iter()
            .filter(|p| filter.student_id.map_or(true, |id| p.student_id == id))
            .filter(|p| filter.course_id.map_or(true, |id| p.course_id == id))
            .filter(|p| filter.state.map_or(true, |state| p.state == state))
            .cloned()
            .collect();
        purchases.reverse();
        Ok(purchases)
    }

    async fn transition_purchase(&self, id: i64, from: PaymentState, to: PaymentState) -> Result<Option<Purchase>, StoreError> {
        let mut t = self.lock();
        match t.purchases.iter_mut().find(|p| p.id == id && p.state == from) {
            Some(purchase) => {
                purchase.state = to;
                Ok(Some(purchase.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn start_progress(&self, student_id: i64, module_id: i64) -> Result<Progress, StoreError> {
        let mut t = self.lock();
        if let Some(existing) = t.progress.iter().find(|p| p.student_id == student_id && p.module_id == module_id) {
            return Ok(existing.clone());
        }
        let created = Progress {
            id: t.next_id(),
            student_id,
            module_id,
            completed: false,
            started_at: Utc::now(),
            completed_at: None,
        };
        t.progress.push(created.clone());
        Ok(created)
    }

    async fn complete_progress(&self, student_id: i64, module_id: i64) -> Result<Progress, StoreError> {
        let mut t = self.lock();
        let now = Utc::now();
        if let Some(existing) = t.progress.iter_mut().find(|p| p.student_id == student_id && p.module_id == module_id) {
            existing.completed = true;
            existing.completed_at.get_or_insert(now);
            return Ok(existing.clone());
        }
        let created = Progress {
            id: t.next_id(),
            student_id,
            module_id,
            completed: true,
            started_at: now,
            completed_at: Some(now),
        };
        t.progress.push(created.clone());
        Ok(created)
    }

    async fn list_progress(&self, student_id: i64, course_id: i64) -> Result<Vec<Progress>, StoreError> {
        let t = self.lock();
        Ok(t.progress
            .iter()
            .filter(|p| p.student_id == student_id)
            .filter(|p| t.modules.iter().any(|m| m.id == p.module_id && m.course_id == course_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn create_certificate(&self, certificate: NewCertificate) -> Result<Certificate, StoreError> {
        let mut t = self.lock();
        if t.certificates
            .iter()
            .any(|c| c.student_id == certificate.student_id && c.course_id == certificate.course_id)
        {
            return Err(unique(constraint::CERTIFICATES_STUDENT_COURSE));
        }
        if t.certificates.iter().any(|c| c.code == certificate.code) {
            return Err(unique(constraint::CERTIFICATES_CODE));
        }
        let created = Certificate {
            id: t.next_id(),
            student_id: certificate.student_id,
            course_id: certificate.course_id,
            issued_on: certificate.issued_on,
            code: certificate.code,
            document_path: certificate.document_path,
        };
        t.certificates.push(created.clone());
        Ok(created)
    }

    async fn find_certificate(&self, id: i64) -> Result<Option<Certificate>, StoreError> {
        Ok(self.lock().certificates.iter().find(|c| c.id == id).cloned())
    }

    async fn find_certificate_for(&self, student_id: i64, course_id: i64) -> Result<Option<Certificate>, StoreError> {
        Ok(self
            .lock()
            .certificates
            .iter()
            .find(|c| c.student_id == student_id && c.course_id == course_id)
            .cloned())
    }

    async fn find_certificate_by_code(&self, code: &str) -> Result<Option<Certificate>, StoreError> {
        Ok(self.lock().certificates.iter().find(|c| c.code == code).cloned())
    }

    async fn list_certificates(&self, student_id: Option<i64>) -> Result<Vec<Certificate>, StoreError> {
        let mut certificates: Vec<Certificate> = self
            .lock()
            .certificates
            .iter()
            .filter(|c| student_id.map_or(true, |id| c.student_id == id))
            .cloned()
            .collect();
        certificates.reverse();
        Ok(certificates)
    }

    async fn list_course_certificates(&self, course_id: i64) -> Result<Vec<Certificate>, StoreError> {
        Ok(self.lock().certificates.iter().filter(|c| c.course_id == course_id).cloned().collect())
    }

    async fn create_template(&self, template: NewTemplate) -> Result<CertificateTemplate, StoreError> {
        let mut t = self.lock();
        let created = CertificateTemplate {
            id: t.next_id(),
            name: template.name,
            description: template.description,
            file_path: template.file_path,
            created_at: Utc::now(),
        };
        t.templates.push(created.clone());
        Ok(created)
    }

    async fn find_template(&self, id: i64) -> Result<Option<CertificateTemplate>, StoreError> {
        Ok(self.lock().templates.iter().find(|t| t.id == id).cloned())
    }

    async fn list_templates(&self) -> Result<Vec<CertificateTemplate>, StoreError> {
        let mut templates = self.lock().templates.clone();
        templates.reverse();
        Ok(templates)
    }

    async fn delete_template(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.lock();
        let before = t.templates.len();
        t.templates.retain(|tpl| tpl.id != id);
        if t.templates.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn restore_template(&self, template: &CertificateTemplate) -> Result<(), StoreError> {
        self.lock().templates.push(template.clone());
        Ok(())
    }
}
