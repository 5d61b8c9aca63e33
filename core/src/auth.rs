//! Auth Interceptor: CSRF header injection plus one-shot session recovery.
//!
//! # Design
//! A request moves through an explicit state machine:
//!
//! ```text
//! Initial ──401──▶ AwaitingRefresh ──refresh answered──▶ Retried ──▶ Done / Failed
//!    │                    │
//!    └─non-401─▶ Done     └─refresh had no response─▶ Failed (transport)
//! ```
//!
//! `Retried` has no outgoing edge back to `AwaitingRefresh`, so at most one
//! refresh call and one replay happen per request. The refresh response
//! status is ignored: the replay itself tells us whether the session was
//! recovered. A refresh that never got a response skips the replay.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::executor::RequestExecutor;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::CsrfSource;

/// State of one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initial,
    AwaitingRefresh,
    Retried,
}

pub struct AuthInterceptor {
    executor: Arc<dyn RequestExecutor>,
    session: Arc<dyn CsrfSource>,
    refresh_path: String,
    csrf_header: String,
}

impl AuthInterceptor {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        session: Arc<dyn CsrfSource>,
        refresh_path: impl Into<String>,
        csrf_header: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            session,
            refresh_path: refresh_path.into(),
            csrf_header: csrf_header.into(),
        }
    }

    /// Execute `request`, recovering from one expired session.
    ///
    /// Returns the 2xx response, or the classified failure of the last
    /// attempt.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut state = AuthState::Initial;
        loop {
            state = match state {
                AuthState::Initial => {
                    let response = self.send(&request).await?;
                    if response.status != 401 {
                        return classify(response);
                    }
                    debug!(path = %request.path, "request unauthenticated, refreshing session");
                    AuthState::AwaitingRefresh
                }
                AuthState::AwaitingRefresh => {
                    match self.refresh().await {
                        Ok(status) => debug!(status, "session refresh answered"),
                        Err(err) => {
                            warn!(error = %err, "session refresh got no response, not retrying");
                            return Err(err);
                        }
                    }
                    AuthState::Retried
                }
                AuthState::Retried => {
                    let response = self.send(&request).await?;
                    if response.status == 401 {
                        warn!(path = %request.path, "request still unauthenticated after refresh");
                    }
                    return classify(response);
                }
            };
        }
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut request = request.clone();
        if let Some(token) = self.session.csrf_token() {
            request.set_header(&self.csrf_header, token);
        }
        self.executor.execute(request).await
    }

    async fn refresh(&self) -> Result<u16, ClientError> {
        let request = HttpRequest::new(HttpMethod::Post, self.refresh_path.clone());
        let response = self.executor.execute(request).await?;
        Ok(response.status)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Map a final response to `Ok` or the matching `ClientError` variant.
pub fn classify(response: HttpResponse) -> Result<HttpResponse, ClientError> {
    if response.is_success() {
        return Ok(response);
    }
    let body = response.body_text();
    if response.status == 401 {
        return Err(ClientError::Unauthenticated { body });
    }
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.error.or(parsed.message))
        .unwrap_or_else(|| body.clone());
    Err(ClientError::Api {
        status: response.status,
        message,
        body,
    })
}
