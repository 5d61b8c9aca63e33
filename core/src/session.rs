//! Read access to the session's CSRF token.
//!
//! The session itself lives in the cookie jar (httpOnly auth cookies the
//! client never sees). The only value the client reads is the double-submit
//! CSRF token, echoed back in a request header.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

/// Source of the current CSRF token. Re-read before every attempt so a token
/// rotated by a refresh is picked up by the retry.
pub trait CsrfSource: Send + Sync {
    fn csrf_token(&self) -> Option<String>;
}

/// Extract a cookie value from a `Cookie` header string (`a=1; b=2`).
/// Empty values count as absent.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reads the CSRF token out of the shared reqwest cookie jar.
#[derive(Clone)]
pub struct CookieJarSession {
    jar: Arc<Jar>,
    url: Url,
    cookie_name: String,
}

impl CookieJarSession {
    pub fn new(jar: Arc<Jar>, url: Url, cookie_name: impl Into<String>) -> Self {
        Self {
            jar,
            url,
            cookie_name: cookie_name.into(),
        }
    }
}

impl CsrfSource for CookieJarSession {
    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, &self.cookie_name)
    }
}

/// A token supplied by the host, for platforms that keep cookies outside the
/// HTTP stack.
#[derive(Debug, Default)]
pub struct StaticCsrf {
    token: RwLock<Option<String>>,
}

impl StaticCsrf {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

impl CsrfSource for StaticCsrf {
    fn csrf_token(&self) -> Option<String> {
        self.token.read().clone().filter(|token| !token.is_empty())
    }
}
