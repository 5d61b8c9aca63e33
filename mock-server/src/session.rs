//! Cookie session, CSRF double-submit check, and the JSON error type.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::AppState;

pub const AUTH_COOKIE: &str = "auth_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// A JSON `{"error": ...}` response.
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub &'static str);

impl ApiError {
    pub fn unauthorized() -> Self {
        Self(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found() -> Self {
        Self(StatusCode::NOT_FOUND, "Not found")
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` values for a fresh session plus a new CSRF token.
pub fn session_cookies(auth: &str, refresh: &str) -> [(header::HeaderName, String); 3] {
    let csrf = Uuid::new_v4().simple().to_string();
    [
        (header::SET_COOKIE, format!("{AUTH_COOKIE}={auth}; Path=/; HttpOnly; SameSite=Lax")),
        (header::SET_COOKIE, format!("{REFRESH_COOKIE}={refresh}; Path=/auth; HttpOnly; SameSite=Lax")),
        (header::SET_COOKIE, format!("{CSRF_COOKIE}={csrf}; Path=/; SameSite=Lax")),
    ]
}

pub fn cleared_cookies() -> [(header::HeaderName, String); 3] {
    [
        (header::SET_COOKIE, format!("{AUTH_COOKIE}=; Path=/; Max-Age=0")),
        (header::SET_COOKIE, format!("{REFRESH_COOKIE}=; Path=/auth; Max-Age=0")),
        (header::SET_COOKIE, format!("{CSRF_COOKIE}=; Path=/; Max-Age=0")),
    ]
}

/// The user behind the request's `auth_token` cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = cookie(&parts.headers, AUTH_COOKIE).ok_or_else(ApiError::unauthorized)?;
        let store = state.store.lock();
        store
            .sessions
            .get(&token)
            .cloned()
            .map(CurrentUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// State-changing requests must echo the `csrf_token` cookie in a header.
pub async fn require_csrf(request: Request, next: Next) -> Response {
    if request.method() == Method::GET {
        return next.run(request).await;
    }
    let expected = cookie(request.headers(), CSRF_COOKIE);
    let presented = request.headers().get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    match (expected.as_deref(), presented) {
        (Some(expected), Some(presented)) if expected == presented => next.run(request).await,
        _ => {
            debug!(path = %request.uri().path(), "rejecting request with bad csrf token");
            ApiError(StatusCode::FORBIDDEN, "Invalid CSRF token").into_response()
        }
    }
}

pub fn csv_content_type() -> (header::HeaderName, HeaderValue) {
    (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_reads_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("auth_token=abc; csrf_token=xyz"));
        assert_eq!(cookie(&headers, CSRF_COOKIE).as_deref(), Some("xyz"));
        assert_eq!(cookie(&headers, AUTH_COOKIE).as_deref(), Some("abc"));
        assert!(cookie(&headers, REFRESH_COOKIE).is_none());
    }

    #[test]
    fn empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("csrf_token="));
        assert!(cookie(&headers, CSRF_COOKIE).is_none());
    }

    #[test]
    fn refresh_cookie_is_scoped_to_auth_paths() {
        let cookies = session_cookies("a", "r");
        assert!(cookies[1].1.contains("Path=/auth"));
        assert!(!cookies[2].1.contains("HttpOnly"));
    }
}
