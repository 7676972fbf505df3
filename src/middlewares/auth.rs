use actix_web::{
    body::MessageBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    middleware::Next,
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, Ready};

use crate::{
    errors::ServiceError,
    services::{accounts, roles::Principal},
    GlobalState,
};

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Resolves the request's principal from the `Authorization` header.
///
/// A missing, invalid or expired token, or one belonging to a deactivated
/// account, leaves the request anonymous; the views decide what that means.
pub async fn authenticate(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let mut principal = Principal::Anonymous;

    if let (Some(token), Some(state)) = (bearer_token(&req), req.app_data::<web::Data<GlobalState>>().cloned()) {
        match accounts::decode_token(&state.settings, &token) {
            Some(user_id) => {
                let user = state.store.find_user(user_id).await.map_err(ServiceError::from)?;
                match user.filter(|user| user.is_active) {
                    Some(user) => principal = Principal::User(user),
                    None => tracing::debug!(user_id, "token of missing or inactive user"),
                }
            }
            None => tracing::debug!("invalid or expired token"),
        }
    }

    req.extensions_mut().insert(principal);
    next.call(req).await
}

impl FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(req.extensions().get::<Principal>().cloned().unwrap_or_default()))
    }
}
