use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use cookie::Cookie;

use crate::dto::UserView;
use crate::error::AppError;
use crate::state::AppState;

/// Value of cookie `name` from the `Cookie` header(s), if present and non-empty.
///
/// Surrounding double quotes are stripped; malformed pairs are skipped.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token from `Authorization: Bearer …`, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| cookie_value(headers, cookie_name))
}

/// The signed-in user of the current request.
pub struct AuthUser(pub UserView);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, state.provider.cookie_name())
            .ok_or_else(|| AppError::Auth("Missing session token".to_string()))?;

        let user = state
            .provider
            .current_user(&token)
            .ok_or_else(|| AppError::Auth("Invalid or expired session".to_string()))?;

        Ok(AuthUser(user))
    }
}
