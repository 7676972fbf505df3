use crate::{
    errors::ServiceError,
    models::user::{Role, User},
    paths,
};

/// The actor behind a request.
#[derive(Debug, Clone, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Anonymous => None,
        }
    }
}

pub const LOGIN_NOTICE: &str = "Please log in to continue.";
pub const PERMISSION_NOTICE: &str = "You do not have permission to access this page.";

pub fn require_login(principal: &Principal) -> Result<&User, ServiceError> {
    principal
        .user()
        .ok_or_else(|| ServiceError::denied(LOGIN_NOTICE, &paths::login()))
}

/// Each view checks its own flag: an administrator is not implicitly an instructor or a student.
pub fn require(principal: &Principal, role: Role) -> Result<&User, ServiceError> {
    let user = require_login(principal)?;
    if !user.has_role(role) {
        tracing::info!(user_id = user.id, ?role, "role check denied");
        return Err(ServiceError::denied(PERMISSION_NOTICE, &paths::home()));
    }
    Ok(user)
}

/// Certificate templates are managed by administrators and superusers.
pub fn require_template_manager(principal: &Principal) -> Result<&User, ServiceError> {
    let user = require_login(principal)?;
    if !(user.has_role(Role::Admin) || user.is_superuser) {
        tracing::info!(user_id = user.id, "template management denied");
        return Err(ServiceError::denied(PERMISSION_NOTICE, &paths::home()));
    }
    Ok(user)
}
