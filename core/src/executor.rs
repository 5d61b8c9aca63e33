//! Request Executor: one HTTP round-trip, no caching, no auth logic.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Performs a single request and returns whatever the server answered.
///
/// Non-2xx statuses are data, not errors; only a missing response (connect
/// failure, timeout) is an `Err`.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// `reqwest`-backed executor. The cookie store is enabled on the inner
/// client, so the session cookies ride along on every call.
#[derive(Clone)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestExecutor {
    pub fn new(config: &ClientConfig, jar: Arc<Jar>) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.normalized_base_url(),
        })
    }

    pub fn url_for(&self, request: &HttpRequest) -> Result<Url, ClientError> {
        let raw = format!("{}{}", self.base_url, request.path_and_query());
        Url::parse(&raw).map_err(|e| ClientError::Serialization(format!("invalid url {raw:?}: {e}")))
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn multipart_form(parts: Vec<crate::http::FormPart>) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for part in parts {
        let mut body = Part::bytes(part.data.to_vec());
        if let Some(file_name) = part.file_name {
            body = body.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            body = body
                .mime_str(&content_type)
                .map_err(|e| ClientError::Serialization(e.to_string()))?;
        }
        form = form.part(part.name, body);
    }
    Ok(form)
}

#[async_trait]
impl RequestExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let url = self.url_for(&request)?;
        let method = request.method;
        let mut builder = self.client.request(to_reqwest_method(method), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(body)) => builder.header("content-type", "application/json").body(body),
            Some(RequestBody::Multipart(parts)) => builder.multipart(multipart_form(parts)?),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await?;
        debug!(method = method.as_str(), %url, status, "request completed");

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::DeletePaymentMethod;
    use crate::registry::build_request;

    fn executor(base: &str) -> ReqwestExecutor {
        ReqwestExecutor::new(&ClientConfig::new(base), Arc::new(Jar::default())).unwrap()
    }

    #[test]
    fn url_joins_base_path_and_query() {
        let mut req = HttpRequest::new(HttpMethod::Get, "/bets/markets");
        req.query.push(("page".to_string(), "2".to_string()));
        let url = executor("http://localhost:4000/").url_for(&req).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/bets/markets?page=2");
    }

    #[test]
    fn base_path_prefix_is_preserved() {
        let req = HttpRequest::new(HttpMethod::Get, "/users/u1");
        let url = executor("https://example.com/api").url_for(&req).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/users/u1");
    }

    #[test]
    fn path_values_cannot_reach_another_route() {
        let req = build_request(&DeletePaymentMethod {
            id: "../../transactions/deposit".to_string(),
        })
        .unwrap();
        let url = executor("http://localhost:4000").url_for(&req).unwrap();
        assert_eq!(
            url.path(),
            "/transactions/payment-methods/..%2F..%2Ftransactions%2Fdeposit"
        );
    }
}
