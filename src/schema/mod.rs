use serde::{Deserialize, Serialize};

pub mod user;
pub mod course;
pub mod certificate;
pub mod dashboard;

#[derive(Deserialize, Serialize, Debug)]
pub struct JWTClaims{
    pub sub: String,
    pub exp: usize,
}

/// Claims of the emailed password-reset link.
#[derive(Deserialize, Serialize, Debug)]
pub struct ResetClaims{
    pub sub: String,
    pub exp: usize,
    pub purpose: String,
    pub fingerprint: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible message returned with every outcome that is not plain data.
#[derive(Serialize, Deserialize, Debug)]
pub struct Notice{
    pub level: NoticeLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl Notice {
    pub fn success(message: &str) -> Self {
        Notice { level: NoticeLevel::Success, message: message.to_string(), redirect: None }
    }

    pub fn info(message: &str) -> Self {
        Notice { level: NoticeLevel::Info, message: message.to_string(), redirect: None }
    }

    pub fn redirect_to(mut self, location: String) -> Self {
        self.redirect = Some(location);
        self
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SignupResponse{
    pub message: String,
    pub id: i64,
}

#[derive(Deserialize, Serialize)]
pub struct IdentifierAndPassword{
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct SigninResponse{
    pub message: String,
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PurchaseResponse{
    pub id: i64,
    pub message: String,
    pub purchase: crate::models::purchase::Purchase,
}
