use serde::{Deserialize, Serialize};

use crate::models::user::Role;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterUser{
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PasswordResetRequest{
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PasswordResetConfirm{
    pub token: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Administrator-side user creation; any combination of roles is allowed.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateUser{
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateUser{
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Query of the emailed reset link.
#[derive(Debug, Deserialize, Serialize)]
pub struct ResetLinkQuery{
    #[serde(default)]
    pub token: String,
}
