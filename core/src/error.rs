//! Error types for the data-access client.
//!
//! # Design
//! One enum covers every failure a consumer can observe. It is `Clone`
//! because a single failed fetch is fanned out to every subscriber of the
//! same cached query. `Unauthenticated` is only produced after the auth
//! interceptor's one refresh-and-retry has also failed; other non-2xx
//! responses land in `Api` with the raw status and body for debugging.

use thiserror::Error;

/// Shown to the user when a mutation fails, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// No response was received: connect failure, reset, or timeout.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered 401 and the session refresh did not fix it.
    #[error("not authenticated")]
    Unauthenticated { body: String },

    /// The server returned a non-2xx status other than an unrecoverable 401.
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The request payload could not be encoded.
    #[error("request serialization failed: {0}")]
    Serialization(String),

    /// A re-fetch triggered by invalidation failed. The previous payload is
    /// still cached, flagged stale.
    #[error("refetch after invalidation failed: {0}")]
    CacheConsistency(Box<ClientError>),

    /// A cursor traversal stopped making progress.
    #[error("pagination stalled: {0}")]
    Pagination(String),

    /// The query entry was dropped (cache reset) before it settled.
    #[error("query evicted before it settled")]
    Evicted,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

impl ClientError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthenticated { .. } => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            ClientError::CacheConsistency(inner) => inner.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The underlying failure, looking through `CacheConsistency` wrappers.
    pub fn root_cause(&self) -> &ClientError {
        match self {
            ClientError::CacheConsistency(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Text for the initiating consumer of a failed mutation.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqwest_failures_without_a_response_are_transport_errors() {
        let err = reqwest::Client::new().get("http://[::1").build().unwrap_err();
        assert!(matches!(ClientError::from(err), ClientError::Transport(_)));
    }

    #[test]
    fn status_looks_through_cache_consistency() {
        let err = ClientError::CacheConsistency(Box::new(ClientError::Api {
            status: 503,
            message: "down".to_string(),
            body: String::new(),
        }));
        assert_eq!(err.status(), Some(503));
        assert!(matches!(err.root_cause(), ClientError::Api { status: 503, .. }));
    }

    #[test]
    fn display_includes_status_and_message() {
        let err = ClientError::Api {
            status: 404,
            message: "Bet not found".to_string(),
            body: r#"{"error":"Bet not found"}"#.to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Bet not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn user_message_is_generic() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }
}
