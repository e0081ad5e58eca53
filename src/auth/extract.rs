use super::verify_token;
use crate::{AppState, error::ApiError};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

pub const AUTH_COOKIE: &str = "auth";

/// An authenticated API caller.
///
/// Put this first in a handler's argument list so the request is rejected
/// before its path or body is looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(ApiError::Unauthenticated)?;

        let username = verify_token(&state.config.app.auth_secret, &token).ok_or_else(|| {
            debug!("Rejected token with invalid signature");
            ApiError::Unauthenticated
        })?;

        if !state.users.contains(&username) {
            debug!("Rejected token for unknown user '{}'", username);
            return Err(ApiError::Unauthenticated);
        }

        Ok(AuthUser { username })
    }
}

/// Bearer token from the `Authorization` header, falling back to the auth cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| get_cookie_value(headers, AUTH_COOKIE))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim().to_string())
    } else {
        None
    }
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}
