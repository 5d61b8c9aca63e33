//! Endpoint Registry: the static operation table and the generic request
//! builder that dispatches over it.
//!
//! # Design
//! `REGISTRY` is plain data: name, verb, path template, kind, response
//! encoding. Each operation's argument struct implements [`Endpoint`] to
//! supply what the table cannot: path parameter values, query pairs, the
//! body, and its tag rules. [`build_request`] joins the two.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::cache::Payload;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::pagination::QueryParams;
use crate::tags::EntityTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Cacheable; provides tags.
    Query,
    /// One-shot; invalidates tags on success.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Blob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub method: HttpMethod,
    /// Path with `:param` placeholders.
    pub path: &'static str,
    pub kind: OperationKind,
    pub response: ResponseKind,
}

const fn query(name: &'static str, path: &'static str) -> EndpointDescriptor {
    EndpointDescriptor {
        name,
        method: HttpMethod::Get,
        path,
        kind: OperationKind::Query,
        response: ResponseKind::Json,
    }
}

const fn mutation(name: &'static str, method: HttpMethod, path: &'static str) -> EndpointDescriptor {
    EndpointDescriptor {
        name,
        method,
        path,
        kind: OperationKind::Mutation,
        response: ResponseKind::Json,
    }
}

pub static REGISTRY: &[EndpointDescriptor] = &[
    // Auth
    mutation("register", HttpMethod::Post, "/auth/register"),
    mutation("login", HttpMethod::Post, "/auth/login"),
    mutation("logout", HttpMethod::Post, "/auth/logout"),
    // Users
    query("getUser", "/users/:id"),
    mutation("updateUser", HttpMethod::Put, "/users/:id"),
    mutation("uploadPhoto", HttpMethod::Post, "/users/upload-photo"),
    // Matches
    mutation("createMatch", HttpMethod::Post, "/matches"),
    query("getMatch", "/matches/:id"),
    mutation("sendMessage", HttpMethod::Post, "/matches/:matchId/message"),
    // Bets / markets
    mutation("createMarket", HttpMethod::Post, "/bets/market/create"),
    query("getMarket", "/bets/market/:id"),
    query("listMarkets", "/bets/markets"),
    query("listMarketsCursor", "/bets/markets/cursor"),
    mutation("placeBet", HttpMethod::Post, "/bets/:betId/place"),
    mutation("createParlay", HttpMethod::Post, "/bets/parlay"),
    mutation("likeBet", HttpMethod::Post, "/bets/:betId/like"),
    mutation("likeMarket", HttpMethod::Post, "/bets/market/:marketId/like"),
    // Transactions
    query("getUserTransactions", "/transactions/user/:userId"),
    query("getUserTransactionsCursor", "/transactions/user/:userId/cursor"),
    EndpointDescriptor {
        name: "exportTransactions",
        method: HttpMethod::Get,
        path: "/transactions/user/:userId/export",
        kind: OperationKind::Query,
        response: ResponseKind::Blob,
    },
    query("listPaymentMethods", "/transactions/payment-methods"),
    mutation("createSetupIntent", HttpMethod::Post, "/transactions/payment-methods/setup-intent"),
    mutation("deletePaymentMethod", HttpMethod::Delete, "/transactions/payment-methods/:id"),
    mutation("createDeposit", HttpMethod::Post, "/transactions/deposit"),
    mutation("createWithdraw", HttpMethod::Post, "/transactions/withdraw"),
    mutation("sendDemoWebhook", HttpMethod::Post, "/transactions/demo/webhook"),
    // Discovery
    query("getDiscoveryFeed", "/discovery/feed"),
    mutation("swipe", HttpMethod::Post, "/discovery/swipe"),
    query("getActiveMatches", "/discovery/matches"),
    mutation("getOddsPreview", HttpMethod::Post, "/discovery/odds-preview"),
    // Seed
    mutation("createDummyMatches", HttpMethod::Post, "/seed/user-matches"),
    // Wallet
    query("getWalletSummary", "/wallet/summary/:userId"),
    query("getWalletPnl", "/wallet/pnl/:userId"),
];

pub fn descriptor(name: &str) -> Result<&'static EndpointDescriptor, ClientError> {
    REGISTRY
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| ClientError::UnknownOperation(name.to_string()))
}

/// Decoding from a cached payload into an operation's output type.
pub trait FromPayload: Sized {
    fn from_payload(payload: &Payload) -> Result<Self, ClientError>;
}

/// Decode a JSON payload into any deserializable type.
pub fn decode_json<T: DeserializeOwned>(payload: &Payload) -> Result<T, ClientError> {
    match payload {
        Payload::Json(value) => {
            T::deserialize(value).map_err(|e| ClientError::Parse(e.to_string()))
        }
        Payload::Blob(_) => Err(ClientError::Parse("expected JSON, got binary body".to_string())),
    }
}

impl FromPayload for serde_json::Value {
    fn from_payload(payload: &Payload) -> Result<Self, ClientError> {
        decode_json(payload)
    }
}

impl FromPayload for bytes::Bytes {
    fn from_payload(payload: &Payload) -> Result<Self, ClientError> {
        match payload {
            Payload::Blob(bytes) => Ok(bytes.clone()),
            Payload::Json(_) => Err(ClientError::Parse("expected binary body, got JSON".to_string())),
        }
    }
}

/// Implement `FromPayload` for JSON response types.
#[macro_export]
macro_rules! json_payload {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::registry::FromPayload for $ty {
                fn from_payload(payload: &$crate::cache::Payload) -> Result<Self, $crate::error::ClientError> {
                    $crate::registry::decode_json(payload)
                }
            }
        )+
    };
}

/// Turn a response into a payload according to the descriptor's encoding.
/// An empty JSON body decodes as `null`.
pub fn payload_from_response(response: HttpResponse, kind: ResponseKind) -> Result<Payload, ClientError> {
    match kind {
        ResponseKind::Blob => Ok(Payload::Blob(response.body)),
        ResponseKind::Json if response.body.is_empty() => Ok(Payload::Json(serde_json::Value::Null)),
        ResponseKind::Json => serde_json::from_slice(&response.body)
            .map(Payload::Json)
            .map_err(|e| ClientError::Parse(e.to_string())),
    }
}

/// One operation's typed arguments.
///
/// `Serialize` on the argument struct doubles as the cache key, so two calls
/// with equal arguments share a cache entry.
pub trait Endpoint: Serialize + Send + Sync + 'static {
    type Output: FromPayload + Send + 'static;

    /// Registry name; must match a `REGISTRY` entry.
    const NAME: &'static str;

    fn path_params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn query(&self) -> QueryParams {
        QueryParams::new()
    }

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        Ok(None)
    }

    fn provides(&self) -> Vec<EntityTag> {
        Vec::new()
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        Vec::new()
    }
}

/// Serialize `value` as a JSON request body.
pub fn json_body<T: Serialize + ?Sized>(value: &T) -> Result<Option<RequestBody>, ClientError> {
    let body = serde_json::to_string(value).map_err(|e| ClientError::Serialization(e.to_string()))?;
    Ok(Some(RequestBody::Json(body)))
}

/// Substitute `:name` segments in `template` with the given values.
pub fn render_path(template: &str, params: &[(&'static str, String)]) -> Result<String, ClientError> {
    let mut rendered = String::with_capacity(template.len());
    for segment in template.split('/').skip(1) {
        rendered.push('/');
        match segment.strip_prefix(':') {
            Some(name) => {
                let value = params
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.as_str())
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| ClientError::Serialization(format!("missing path parameter :{name}")))?;
                rendered.push_str(&encode_segment(name, value)?);
            }
            None => rendered.push_str(segment),
        }
    }
    Ok(rendered)
}

/// Percent-encode `value` so it stays one path segment: `/`, `?`, `#` and
/// `%` are escaped, and bare dot segments are refused.
fn encode_segment(name: &str, value: &str) -> Result<String, ClientError> {
    if value == "." || value == ".." {
        return Err(ClientError::Serialization(format!("path parameter :{name} cannot be {value:?}")));
    }
    let mut scratch = Url::parse("http://segment.invalid/").map_err(|e| ClientError::Serialization(e.to_string()))?;
    scratch
        .path_segments_mut()
        .map_err(|()| ClientError::Serialization(format!("cannot encode path parameter :{name}")))?
        .push(value);
    Ok(scratch.path().trim_start_matches('/').to_string())
}

/// Build the request for one operation call.
pub fn build_request<E: Endpoint>(args: &E) -> Result<HttpRequest, ClientError> {
    let descriptor = descriptor(E::NAME)?;
    let path = render_path(descriptor.path, &args.path_params())?;
    Ok(HttpRequest {
        method: descriptor.method,
        path,
        query: args.query().into_pairs(),
        headers: Vec::new(),
        body: args.body()?,
    })
}
