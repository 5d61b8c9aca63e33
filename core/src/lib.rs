//! Data-access core for the dating + prediction-market client.
//!
//! # Overview
//! Every server call goes through one pipeline: a typed operation from the
//! endpoint registry is turned into an `HttpRequest`, passed through the
//! auth interceptor (CSRF header, one refresh-and-retry on 401) to a
//! `RequestExecutor`, and the result lands in the query cache, which
//! deduplicates identical queries and re-fetches them when a mutation
//! invalidates a tag they provide.
//!
//! # Design
//! - The executor is a trait; `ReqwestExecutor` is the production transport
//!   and tests substitute scripted ones.
//! - `ApiClient` is an explicit instance that owns the interceptor and the
//!   cache. Nothing is global.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod operations;
pub mod pagination;
pub mod registry;
pub mod session;
pub mod tags;
pub mod types;

pub use auth::AuthInterceptor;
pub use cache::{Payload, QueryCache, QueryKey, QuerySnapshot, QueryStatus};
pub use client::{ApiClient, QueryHandle};
pub use config::ClientConfig;
pub use error::ClientError;
pub use executor::{ReqwestExecutor, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use pagination::{CursorPage, CursorParams, Direction, OffsetPage, OffsetParams, TransactionFilter};
pub use registry::{Endpoint, OperationKind, REGISTRY};
pub use tags::{EntityTag, TagType};
