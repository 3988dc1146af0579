//! Caller identity, forwarded by the API gateway as headers.

use crate::domain::actor::{Actor, Role};
use crate::error::PaymentError;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, PaymentError> {
    let user_id = header(headers, USER_ID_HEADER)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(PaymentError::Unauthorized)?;
    let role = match header(headers, USER_ROLE_HEADER).map(str::to_ascii_lowercase).as_deref() {
        Some("admin") => Role::Admin,
        Some("student") => Role::Student,
        _ => return Err(PaymentError::Unauthorized),
    };

    Ok(Actor {
        user_id,
        role,
        email: header(headers, USER_EMAIL_HEADER).map(str::to_string),
    })
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = PaymentError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}
