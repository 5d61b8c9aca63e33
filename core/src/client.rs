//! The client instance consumers hold: registry + interceptor + cache.
//!
//! # Design
//! `ApiClient` is constructed explicitly and passed around; there is no
//! global store. Queries go through the cache and hand back a
//! [`QueryHandle`] that keeps the entry alive. Mutations bypass the cache and
//! apply their invalidations only after the server accepted them.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use reqwest::cookie::Jar;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthInterceptor;
use crate::cache::{Fetcher, QueryCache, QueryKey, QuerySnapshot, Subscription};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::executor::{ReqwestExecutor, RequestExecutor};
use crate::registry::{build_request, descriptor, payload_from_response, Endpoint, FromPayload, OperationKind};
use crate::session::{CookieJarSession, CsrfSource};

pub struct ApiClient {
    config: ClientConfig,
    interceptor: Arc<AuthInterceptor>,
    cache: QueryCache,
}

impl ApiClient {
    /// Client over `reqwest` with a private cookie jar.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let jar = Arc::new(Jar::default());
        let executor = ReqwestExecutor::new(&config, Arc::clone(&jar))?;
        let base_url = config.normalized_base_url();
        let url = Url::parse(&base_url).map_err(|e| ClientError::Config(format!("invalid base url {base_url:?}: {e}")))?;
        let session = CookieJarSession::new(jar, url, config.csrf_cookie.clone());
        Ok(Self::with_executor(config, Arc::new(executor), Arc::new(session)))
    }

    /// Client over a host-supplied transport and token source.
    pub fn with_executor(
        config: ClientConfig,
        executor: Arc<dyn RequestExecutor>,
        session: Arc<dyn CsrfSource>,
    ) -> Self {
        let interceptor = AuthInterceptor::new(
            executor,
            session,
            config.refresh_path.clone(),
            config.csrf_header.clone(),
        );
        let cache = QueryCache::new(config.keep_unused_for);
        Self {
            config,
            interceptor: Arc::new(interceptor),
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Subscribe to a query. Must be called inside a tokio runtime; the fetch
    /// (if one is needed) starts immediately on a spawned task.
    pub fn query<E: Endpoint>(&self, args: E) -> Result<QueryHandle<E>, ClientError> {
        let descriptor = descriptor(E::NAME)?;
        if descriptor.kind != OperationKind::Query {
            return Err(ClientError::UnknownOperation(format!("{} is not a query", E::NAME)));
        }
        let key_args = serde_json::to_string(&args).map_err(|e| ClientError::Serialization(e.to_string()))?;
        let key = QueryKey::new(E::NAME, key_args);
        let request = build_request(&args)?;
        let response_kind = descriptor.response;

        let interceptor = Arc::clone(&self.interceptor);
        let fetcher: Fetcher = Arc::new(move || {
            let interceptor = Arc::clone(&interceptor);
            let request = request.clone();
            async move {
                let response = interceptor.execute(request).await?;
                payload_from_response(response, response_kind)
            }
            .boxed()
        });

        let subscription = self.cache.subscribe(key, args.provides(), fetcher);
        Ok(QueryHandle {
            subscription,
            endpoint: PhantomData,
        })
    }

    /// Subscribe, wait for the settled result, and release the subscription.
    pub async fn fetch<E: Endpoint>(&self, args: E) -> Result<E::Output, ClientError> {
        let mut handle = self.query(args)?;
        handle.result().await
    }

    /// Run a mutation. Its invalidations apply once the server accepted it,
    /// even if the response body then fails to decode.
    pub async fn mutate<E: Endpoint>(&self, args: &E) -> Result<E::Output, ClientError> {
        let descriptor = descriptor(E::NAME)?;
        if descriptor.kind != OperationKind::Mutation {
            return Err(ClientError::UnknownOperation(format!("{} is not a mutation", E::NAME)));
        }
        let request = build_request(args)?;
        let response = match self.interceptor.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(operation = E::NAME, error = %err, "mutation failed");
                return Err(err);
            }
        };

        let tags = args.invalidates();
        debug!(operation = E::NAME, tags = tags.len(), "mutation succeeded");
        self.cache.invalidate(&tags);

        payload_from_response(response, descriptor.response)
            .and_then(|payload| E::Output::from_payload(&payload))
            .inspect_err(|err| warn!(operation = E::NAME, error = %err, "mutation response unreadable"))
    }

    /// Drop every cached query, e.g. after logout.
    pub fn reset(&self) {
        self.cache.clear();
    }
}

/// A typed subscription to one cached query. Dropping it unsubscribes.
pub struct QueryHandle<E: Endpoint> {
    subscription: Subscription,
    endpoint: PhantomData<fn() -> E>,
}

impl<E: Endpoint> QueryHandle<E> {
    pub fn key(&self) -> &QueryKey {
        self.subscription.key()
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.subscription.snapshot()
    }

    /// Decode whatever data the entry currently holds, fresh or stale.
    pub fn data(&self) -> Option<Result<E::Output, ClientError>> {
        let data = self.subscription.snapshot().data?;
        Some(E::Output::from_payload(&data))
    }

    /// Wait for the query to settle and decode its result.
    pub async fn result(&mut self) -> Result<E::Output, ClientError> {
        let payload = self.subscription.settled().await?;
        E::Output::from_payload(&payload)
    }

    pub async fn changed(&mut self) -> Result<QuerySnapshot, ClientError> {
        self.subscription.changed().await
    }

    pub fn refetch(&self) {
        self.subscription.refetch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::operations::{GetUser, ListMarkets, PlaceBet};
    use crate::session::StaticCsrf;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Answers by path; records every request it saw.
    struct Routes {
        seen: Mutex<Vec<HttpRequest>>,
        place_status: u16,
    }

    impl Routes {
        fn new(place_status: u16) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                place_status,
            })
        }

        fn hits(&self, path: &str) -> usize {
            self.seen.lock().iter().filter(|r| r.path == path).count()
        }
    }

    #[async_trait]
    impl RequestExecutor for Routes {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
            self.seen.lock().push(request.clone());
            let n = self.hits(&request.path);
            let response = match request.path.as_str() {
                "/bets/markets" => HttpResponse::new(
                    200,
                    json!({ "items": [{ "_id": "m1", "fetch": n }], "page": 1, "limit": 20 }).to_string(),
                ),
                "/bets/b1/place" => HttpResponse::new(self.place_status, r#"{"ok":true}"#),
                "/bets/b2/place" => HttpResponse::new(200, "OK"),
                _ => HttpResponse::new(404, r#"{"error":"Not found"}"#),
            };
            Ok(response)
        }
    }

    fn client(routes: Arc<Routes>) -> ApiClient {
        ApiClient::with_executor(
            ClientConfig::default(),
            routes,
            Arc::new(StaticCsrf::new(Some("tok".to_string()))),
        )
    }

    #[tokio::test]
    async fn place_bet_refreshes_subscribed_market_list() {
        let routes = Routes::new(200);
        let client = client(routes.clone());
        let mut markets = client.query(ListMarkets::default()).unwrap();
        let first = markets.result().await.unwrap();
        assert_eq!(first.items[0]["fetch"], 1);

        client.mutate(&PlaceBet::new("b1", 25.0)).await.unwrap();
        assert!(markets.snapshot().is_stale);
        let second = markets.result().await.unwrap();
        assert_eq!(second.items[0]["fetch"], 2);
        assert_eq!(routes.hits("/bets/markets"), 2);
    }

    #[tokio::test]
    async fn failed_mutation_invalidates_nothing() {
        let routes = Routes::new(400);
        let client = client(routes.clone());
        let mut markets = client.query(ListMarkets::default()).unwrap();
        markets.result().await.unwrap();

        let err = client.mutate(&PlaceBet::new("b1", 25.0)).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!markets.snapshot().is_stale);
        assert_eq!(routes.hits("/bets/markets"), 1);
    }

    #[tokio::test]
    async fn accepted_mutation_invalidates_even_if_body_is_unreadable() {
        let routes = Routes::new(200);
        let client = client(routes.clone());
        let mut markets = client.query(ListMarkets::default()).unwrap();
        markets.result().await.unwrap();

        let err = client.mutate(&PlaceBet::new("b2", 25.0)).await.unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
        assert!(markets.snapshot().is_stale);
        let refreshed = markets.result().await.unwrap();
        assert_eq!(refreshed.items[0]["fetch"], 2);
    }

    #[tokio::test]
    async fn identical_queries_share_one_request() {
        let routes = Routes::new(200);
        let client = client(routes.clone());
        let mut a = client.query(ListMarkets::default()).unwrap();
        let mut b = client.query(ListMarkets::default()).unwrap();
        let (a, b) = tokio::join!(a.result(), b.result());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(routes.hits("/bets/markets"), 1);
    }

    #[tokio::test]
    async fn fetch_surfaces_api_errors() {
        let routes = Routes::new(200);
        let client = client(routes);
        let err = client.fetch(GetUser { id: "missing".to_string() }).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn csrf_header_is_attached() {
        let routes = Routes::new(200);
        let client = client(routes.clone());
        client.mutate(&PlaceBet::new("b1", 1.0)).await.unwrap();
        let seen = routes.seen.lock();
        assert_eq!(seen[0].header("x-csrf-token"), Some("tok"));
    }

    #[tokio::test]
    async fn operation_kind_is_enforced() {
        let client = client(Routes::new(200));
        assert!(matches!(
            client.mutate(&ListMarkets::default()).await,
            Err(ClientError::UnknownOperation(_))
        ));
        assert!(matches!(
            client.query(PlaceBet::new("b1", 1.0)),
            Err(ClientError::UnknownOperation(_))
        ));
    }

    #[tokio::test]
    async fn reset_drops_cached_queries() {
        let client = client(Routes::new(200));
        let mut markets = client.query(ListMarkets::default()).unwrap();
        markets.result().await.unwrap();
        assert!(!client.cache().is_empty());
        client.reset();
        assert!(client.cache().is_empty());
        assert!(matches!(markets.changed().await, Err(ClientError::Evicted)));
    }
}
