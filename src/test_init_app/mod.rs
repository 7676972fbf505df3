pub mod memory;

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, OnceLock,
    },
};

use actix_http::Request;
use actix_service::Service;
use actix_web::{dev::ServiceResponse, test, web, App, Error};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    config::Settings,
    documents::PdfRenderer,
    email::EmailSender,
    errors::AssetError,
    handlers,
    models::{
        course::{Course, CourseStatus, CourseType, NewCourse},
        user::{NewUser, Role, Roles, User},
    },
    services::{accounts, catalog},
    storage::AssetStore,
    utils::hash_password,
    GlobalState,
};

use self::memory::MemoryStore;

pub const SEED_PASSWORD: &str = "password123";

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// Asset store kept in a map; removals can be made to fail.
#[derive(Default)]
pub struct MemoryAssetStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_removals: AtomicBool,
}

impl MemoryAssetStore {
    pub fn contains(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }

    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), AssetError> {
        self.files.lock().unwrap().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }

    async fn remove(&self, path: &str) -> Result<(), AssetError> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(AssetError::Io(format!("{path}: permission denied")));
        }
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &str) -> Result<bool, AssetError> {
        Ok(self.contains(path))
    }
}

/// Keeps every sent email as `(to, subject, body)`.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
    async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), String> {
        Err("connection refused".to_string())
    }
}

pub struct TestContext {
    pub state: GlobalState,
    pub store: Arc<MemoryStore>,
    pub assets: Arc<MemoryAssetStore>,
    pub mailer: Arc<RecordingEmailSender>,
}

pub fn test_context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let assets = Arc::new(MemoryAssetStore::default());
    let mailer = Arc::new(RecordingEmailSender::default());

    let state = GlobalState {
        store: store.clone(),
        assets: assets.clone(),
        mailer: mailer.clone(),
        renderer: Arc::new(PdfRenderer),
        settings: Settings::for_tests(),
    };

    TestContext { state, store, assets, mailer }
}

pub fn test_state() -> (GlobalState, Arc<RecordingEmailSender>) {
    let ctx = test_context();
    (ctx.state, ctx.mailer)
}

pub fn test_state_with_failing_mailer() -> GlobalState {
    let mut state = test_context().state;
    state.mailer = Arc::new(FailingEmailSender);
    state
}

// argon2 is slow in debug builds, so seeded users share one hash
fn seed_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(SEED_PASSWORD).unwrap()).clone()
}

/// Active user whose password is [`SEED_PASSWORD`].
pub async fn seed_user(state: &GlobalState, username: &str, email: &str, roles: &[Role]) -> User {
    state
        .store
        .create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: format!("{username} tester"),
            password_hash: seed_hash(),
            roles: Roles::of(roles),
            is_superuser: false,
        })
        .await
        .unwrap()
}

pub async fn seed_course(state: &GlobalState, instructor: &User, title: &str, price: Decimal) -> Course {
    let slug = catalog::unique_slug(state, title).await.unwrap();
    state
        .store
        .create_course(NewCourse {
            instructor_id: instructor.id,
            title: title.to_string(),
            slug,
            description: format!("All about {title}"),
            price,
            course_type: CourseType::Recorded,
            status: CourseStatus::Active,
            material_url: None,
        })
        .await
        .unwrap()
}

pub fn bearer(state: &GlobalState, user: &User) -> (&'static str, String) {
    let token = accounts::issue_token(&state.settings, user).unwrap();
    ("Authorization", format!("Bearer {token}"))
}

pub async fn init(state: GlobalState) -> impl Service<Request, Response = ServiceResponse, Error = Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(handlers::configure)
            .default_service(web::to(handlers::not_found)),
    )
    .await
}
