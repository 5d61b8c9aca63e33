//! HTTP transport types shared by the executor, the auth interceptor and the
//! endpoint registry.
//!
//! # Design
//! Requests and responses are plain data. The registry builds `HttpRequest`
//! values relative to the API root; the executor joins them onto the base URL
//! and performs the round-trip. Keeping the request shape as data lets the
//! interceptor replay an identical request after a session refresh and lets
//! tests assert on the exact wire shape without a network.

use bytes::Bytes;
use url::form_urlencoded;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One named part of a multipart form body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized JSON document, sent with `content-type: application/json`.
    Json(String),
    /// Multipart form; the executor picks the boundary.
    Multipart(Vec<FormPart>),
}

impl RequestBody {
    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(body) => Some(body),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is relative to the API base URL and always starts with `/`. Query
/// pairs are kept separate so absent parameters can be left out entirely
/// rather than rendered as empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Path plus the url-encoded query string, e.g. `/bets/markets?page=1&limit=20`.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }

    /// Replace any header with the same (case-insensitive) name, then append.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as text, lossily decoded. Used for error reporting only.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query_without_params_is_just_the_path() {
        let req = HttpRequest::new(HttpMethod::Get, "/discovery/matches");
        assert_eq!(req.path_and_query(), "/discovery/matches");
    }

    #[test]
    fn path_and_query_encodes_values() {
        let mut req = HttpRequest::new(HttpMethod::Get, "/wallet/pnl/u1");
        req.query.push(("range".to_string(), "last 7d&more".to_string()));
        assert_eq!(req.path_and_query(), "/wallet/pnl/u1?range=last+7d%26more");
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::new(HttpMethod::Post, "/bets/parlay");
        req.set_header("X-CSRF-Token", "old");
        req.set_header("x-csrf-token", "new");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("x-csrf-token"), Some("new"));
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(201, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
    }
}
