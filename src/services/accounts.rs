use chrono::{Duration, Utc};
use email_address::EmailAddress;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    config::Settings,
    errors::{ServiceError, StoreError},
    models::user::{NewUser, Role, Roles, User, UserChanges},
    paths::API_PREFIX,
    schema::{
        user::{CreateUser, PasswordResetConfirm, RegisterUser, UpdateUser},
        JWTClaims, ResetClaims,
    },
    utils::{hash_password, password_fingerprint, verify_password},
    GlobalState,
};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const INVALID_RESET_LINK: &str = "This password reset link is invalid or has expired.";
pub const RESET_REQUESTED: &str =
    "If an account with that email exists, we have sent instructions to reset your password.";
const RESET_PURPOSE: &str = "password_reset";
const MIN_PASSWORD_LEN: usize = 8;

pub fn issue_token(settings: &Settings, user: &User) -> Result<String, ServiceError> {
    let tomorrow = Utc::now() + Duration::days(1);

    let claims = JWTClaims{
        sub: user.id.to_string(),
        exp: tomorrow.timestamp() as usize
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(settings.jwt_secret.as_bytes()))
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Returns the user id a session token was issued for, if the token is valid.
pub fn decode_token(settings: &Settings, token: &str) -> Option<i64> {
    let decoded = decode::<JWTClaims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    decoded.claims.sub.parse().ok()
}

// Reset links are signed with a derived key so they can never pass as session tokens.
fn reset_key(settings: &Settings) -> Vec<u8> {
    format!("{}:{RESET_PURPOSE}", settings.jwt_secret).into_bytes()
}

fn reset_token(settings: &Settings, user: &User) -> Result<String, ServiceError> {
    let claims = ResetClaims {
        sub: user.id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        purpose: RESET_PURPOSE.to_string(),
        fingerprint: password_fingerprint(&user.password_hash),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(&reset_key(settings)))
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("The field `{field}` is required.")));
    }
    Ok(trimmed.to_string())
}

fn valid_email(value: &str) -> Result<String, ServiceError> {
    let email = required(value, "email")?;
    if !EmailAddress::is_valid(&email) {
        return Err(ServiceError::Validation("Enter a valid email address.".to_string()));
    }
    Ok(email)
}

fn validate_new_password(password1: &str, password2: &str) -> Result<(), ServiceError> {
    if password1.is_empty() || password2.is_empty() {
        return Err(ServiceError::Validation("The field `password` is required.".to_string()));
    }
    if password1 != password2 {
        return Err(ServiceError::Validation("The passwords do not match.".to_string()));
    }
    if password1.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "The password must contain at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, ServiceError> {
    hash_password(password).map_err(|e| ServiceError::Internal(e.to_string()))
}

// Duplicate usernames and emails are form errors, not conflicts.
fn as_validation(err: StoreError) -> ServiceError {
    match ServiceError::from(err) {
        ServiceError::Duplicate(message) => ServiceError::Validation(message),
        other => other,
    }
}

async fn ensure_identity_free(state: &GlobalState, username: &str, email: &str) -> Result<(), ServiceError> {
    if state.store.find_user_by_username(username).await?.is_some() {
        return Err(ServiceError::Validation("A user with this username already exists.".to_string()));
    }
    if state.store.find_user_by_email(email).await?.is_some() {
        return Err(ServiceError::Validation("A user with this email already exists.".to_string()));
    }
    Ok(())
}

pub async fn register(state: &GlobalState, form: RegisterUser) -> Result<User, ServiceError> {
    let username = required(&form.username, "username")?;
    let full_name = required(&form.full_name, "full_name")?;
    let email = valid_email(&form.email)?;
    validate_new_password(&form.password1, &form.password2)?;

    ensure_identity_free(state, &username, &email).await?;

    let user = state
        .store
        .create_user(NewUser {
            username,
            email,
            full_name,
            password_hash: hash(&form.password1)?,
            roles: Roles::NONE.with(Role::Student),
            is_superuser: false,
        })
        .await
        .map_err(as_validation)?;

    tracing::info!(user_id = user.id, username = %user.username, "student registered");

    let body = format!(
        "Hi {},\n\nWelcome to Conecta Saber! Your username is {}.\n",
        user.full_name, user.username
    );
    if let Err(e) = state.mailer.send_email(&user.email, "Welcome to Conecta Saber", &body).await {
        tracing::warn!(user_id = user.id, error = %e, "welcome email failed");
    }

    Ok(user)
}

/// An identifier containing `@` is looked up as an email first; when no account matches,
/// the raw input is used as the username.
pub async fn resolve_username(state: &GlobalState, identifier: &str) -> Result<String, ServiceError> {
    if identifier.contains('@') {
        if let Some(user) = state.store.find_user_by_email(identifier).await? {
            return Ok(user.username);
        }
    }
    Ok(identifier.to_string())
}

pub async fn login(state: &GlobalState, identifier: &str, password: &str) -> Result<(User, String), ServiceError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(ServiceError::Validation(INVALID_CREDENTIALS.to_string()));
    }

    let username = resolve_username(state, identifier).await?;

    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ServiceError::Validation(INVALID_CREDENTIALS.to_string()))?;

    verify_password(password, &user.password_hash)
        .map_err(|_| ServiceError::Validation(INVALID_CREDENTIALS.to_string()))?;

    let token = issue_token(&state.settings, &user)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok((user, token))
}

/// Always succeeds for a non-empty email so the response never reveals whether it is registered.
pub async fn request_password_reset(state: &GlobalState, email: &str) -> Result<(), ServiceError> {
    let email = required(email, "email")?;

    match state.store.find_user_by_email(&email).await {
        Ok(Some(user)) if user.is_active => {
            let token = reset_token(&state.settings, &user)?;
            let link = format!(
                "{}{API_PREFIX}/user/password-reset/confirm?token={token}",
                state.settings.site_url.trim_end_matches('/')
            );
            let body = format!(
                "Hi {},\n\nUse the link below to choose a new password. It expires in one hour.\n\n{link}\n",
                user.full_name
            );
            if let Err(e) = state.mailer.send_email(&user.email, "Password reset", &body).await {
                tracing::warn!(user_id = user.id, error = %e, "password reset email failed");
            }
        }
        Ok(_) => tracing::debug!("password reset requested for unknown or inactive account"),
        Err(e) => tracing::error!(error = %e, "password reset lookup failed"),
    }

    Ok(())
}

pub async fn confirm_password_reset(state: &GlobalState, form: PasswordResetConfirm) -> Result<(), ServiceError> {
    let invalid = || ServiceError::Validation(INVALID_RESET_LINK.to_string());

    let claims = decode::<ResetClaims>(
        &form.token,
        &DecodingKey::from_secret(&reset_key(&state.settings)),
        &Validation::default(),
    )
    .map_err(|_| invalid())?
    .claims;

    if claims.purpose != RESET_PURPOSE {
        return Err(invalid());
    }
    let user_id: i64 = claims.sub.parse().map_err(|_| invalid())?;
    let user = state
        .store
        .find_user(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;

    // the fingerprint changes as soon as the password does, so a link works once
    if password_fingerprint(&user.password_hash) != claims.fingerprint {
        return Err(invalid());
    }

    validate_new_password(&form.password1, &form.password2)?;
    state.store.set_password(user.id, &hash(&form.password1)?).await?;

    tracing::info!(user_id = user.id, "password reset completed");
    Ok(())
}

pub async fn list_users(state: &GlobalState) -> Result<Vec<User>, ServiceError> {
    Ok(state.store.list_users().await?)
}

pub async fn create_user(state: &GlobalState, form: CreateUser) -> Result<User, ServiceError> {
    let username = required(&form.username, "username")?;
    let full_name = required(&form.full_name, "full_name")?;
    let email = valid_email(&form.email)?;
    validate_new_password(&form.password, &form.password)?;

    ensure_identity_free(state, &username, &email).await?;

    let user = state
        .store
        .create_user(NewUser {
            username,
            email,
            full_name,
            password_hash: hash(&form.password)?,
            roles: Roles::of(&form.roles),
            is_superuser: form.is_superuser,
        })
        .await
        .map_err(as_validation)?;

    tracing::info!(user_id = user.id, roles = ?user.roles.to_vec(), "user created by administrator");
    Ok(user)
}

const SELF_DEACTIVATION: &str = "You cannot deactivate your own account.";

pub async fn update_user(state: &GlobalState, acting: &User, id: i64, form: UpdateUser) -> Result<User, ServiceError> {
    if acting.id == id && !form.is_active {
        return Err(ServiceError::Validation(SELF_DEACTIVATION.to_string()));
    }
    if state.store.find_user(id).await?.is_none() {
        return Err(ServiceError::NotFound);
    }

    let changes = UserChanges {
        email: valid_email(&form.email)?,
        full_name: required(&form.full_name, "full_name")?,
        roles: Roles::of(&form.roles),
        is_superuser: form.is_superuser,
        is_active: form.is_active,
    };

    let user = state.store.update_user(id, changes).await.map_err(as_validation)?;
    tracing::info!(user_id = user.id, acting_id = acting.id, "user updated by administrator");
    Ok(user)
}

/// Users are never hard-deleted; deactivation blocks login and drops their session.
pub async fn deactivate_user(state: &GlobalState, acting: &User, id: i64) -> Result<User, ServiceError> {
    if acting.id == id {
        return Err(ServiceError::Validation(SELF_DEACTIVATION.to_string()));
    }
    let user = state.store.find_user(id).await?.ok_or(ServiceError::NotFound)?;

    let changes = UserChanges {
        email: user.email,
        full_name: user.full_name,
        roles: user.roles,
        is_superuser: user.is_superuser,
        is_active: false,
    };

    let user = state.store.update_user(id, changes).await?;
    tracing::info!(user_id = user.id, acting_id = acting.id, "user deactivated");
    Ok(user)
}
