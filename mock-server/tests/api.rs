use axum::http::{self, header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{router, AppState, DEMO_EMAIL, DEMO_PASSWORD};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

/// Cookies a browser would hold after a response, as `name=value` pairs.
fn set_cookies(response: &axum::response::Response) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

struct Session {
    cookies: Vec<(String, String)>,
    user_id: String,
}

impl Session {
    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn get(&self, name: &str) -> &str {
        self.cookies.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()).unwrap()
    }

    fn request(&self, method: &str, uri: &str, body: &str) -> Request<String> {
        let mut request = json_request(method, uri, body);
        request
            .headers_mut()
            .insert(header::COOKIE, self.cookie_header().parse().unwrap());
        request
    }

    fn csrf_request(&self, method: &str, uri: &str, body: &str) -> Request<String> {
        let mut request = self.request(method, uri, body);
        request
            .headers_mut()
            .insert("x-csrf-token", self.get("csrf_token").parse().unwrap());
        request
    }
}

fn demo() -> (AppState, Router) {
    let state = AppState::new();
    state.seed_user("demo", DEMO_EMAIL, DEMO_PASSWORD);
    let app = router(state.clone());
    (state, app)
}

async fn login(app: &Router) -> Session {
    let body = format!(r#"{{"email":"{DEMO_EMAIL}","password":"{DEMO_PASSWORD}"}}"#);
    let resp = app.clone().oneshot(json_request("POST", "/auth/login", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookies(&resp);
    let json: Value = body_json(resp).await;
    Session {
        cookies,
        user_id: json["user"]["id"].as_str().unwrap().to_string(),
    }
}

// --- auth ---

#[tokio::test]
async fn register_returns_201_and_sets_session_cookies() {
    let (_, app) = demo();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/auth/register",
            r#"{"username":"ana","email":"ana@example.com","password":"secret1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let names: Vec<String> = set_cookies(&resp).into_iter().map(|(k, _)| k).collect();
    assert_eq!(names, ["auth_token", "refresh_token", "csrf_token"]);
    let user: Value = body_json(resp).await;
    assert_eq!(user["username"], "ana");
}

#[tokio::test]
async fn register_duplicate_email_returns_409() {
    let (_, app) = demo();
    let body = format!(r#"{{"username":"x","email":"{DEMO_EMAIL}","password":"secret1"}}"#);
    let resp = app.oneshot(json_request("POST", "/auth/register", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_wrong_password_returns_401() {
    let (_, app) = demo();
    let body = format!(r#"{{"email":"{DEMO_EMAIL}","password":"nope"}}"#);
    let resp = app.oneshot(json_request("POST", "/auth/login", &body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Invalid credentials");
}

#[tokio::test]
async fn refresh_rotates_an_expired_session() {
    let (state, app) = demo();
    state.seed_markets(1);
    let session = login(&app).await;
    state.expire_sessions();

    let resp = app.clone().oneshot(session.request("GET", "/bets/markets", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Unauthorized");

    let resp = app.clone().oneshot(session.request("POST", "/auth/refresh", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let renewed = Session {
        cookies: set_cookies(&resp),
        user_id: session.user_id.clone(),
    };
    assert_ne!(renewed.get("csrf_token"), session.get("csrf_token"));
    assert_eq!(state.refresh_calls(), 1);

    let resp = app.clone().oneshot(renewed.request("GET", "/bets/markets", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Refresh tokens are single use.
    let resp = app.oneshot(session.request("POST", "/auth/refresh", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_session() {
    let (_, app) = demo();
    let session = login(&app).await;
    let resp = app.clone().oneshot(session.request("POST", "/auth/logout", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).iter().all(|(_, v)| v.is_empty()));

    let resp = app.oneshot(session.request("GET", "/bets/markets", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- csrf ---

#[tokio::test]
async fn mutation_without_csrf_header_returns_403() {
    let (state, app) = demo();
    state.seed_markets(1);
    let bet_id = state.first_bet_id().unwrap();
    let session = login(&app).await;

    let resp = app
        .oneshot(session.request("POST", &format!("/bets/{bet_id}/place"), r#"{"stake":25}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json: Value = body_json(resp).await;
    assert_eq!(json["error"], "Invalid CSRF token");
}

#[tokio::test]
async fn place_bet_with_csrf_updates_market_stats() {
    let (state, app) = demo();
    state.seed_markets(1);
    let bet_id = state.first_bet_id().unwrap();
    let session = login(&app).await;

    let resp = app
        .oneshot(session.csrf_request("POST", &format!("/bets/{bet_id}/place"), r#"{"stake":25}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["market"]["totalStakedUSD"], 25.0);
}

#[tokio::test]
async fn place_bet_unknown_bet_returns_404() {
    let (_, app) = demo();
    let session = login(&app).await;
    let resp = app
        .oneshot(session.csrf_request("POST", "/bets/missing/place", r#"{"stake":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- markets ---

#[tokio::test]
async fn markets_offset_page() {
    let (state, app) = demo();
    state.seed_markets(5);
    let session = login(&app).await;
    let resp = app
        .oneshot(session.request("GET", "/bets/markets?page=2&limit=2", ""))
        .await
        .unwrap();
    let json: Value = body_json(resp).await;
    assert_eq!(json["page"], 2);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn markets_cursor_walk_echoes_cursor_on_last_page() {
    let (state, app) = demo();
    state.seed_markets(3);
    let session = login(&app).await;

    let resp = app
        .clone()
        .oneshot(session.request("GET", "/bets/markets/cursor?limit=2&direction=forward", ""))
        .await
        .unwrap();
    let first: Value = body_json(resp).await;
    assert_eq!(first["hasMore"], true);
    let cursor = first["nextCursor"].as_str().unwrap();

    let uri = format!("/bets/markets/cursor?limit=2&direction=forward&cursor={cursor}");
    let resp = app.oneshot(session.request("GET", &uri, "")).await.unwrap();
    let last: Value = body_json(resp).await;
    assert_eq!(last["hasMore"], false);
    assert_eq!(last["items"].as_array().unwrap().len(), 1);
    assert_eq!(last["nextCursor"], last["items"][0]["_id"]);
}

#[tokio::test]
async fn markets_cursor_rejects_out_of_range_limit() {
    let (_, app) = demo();
    let session = login(&app).await;
    let resp = app
        .oneshot(session.request("GET", "/bets/markets/cursor?limit=0", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- transactions ---

#[tokio::test]
async fn transactions_filter_by_type() {
    let (state, app) = demo();
    let session = login(&app).await;
    state.seed_transactions(&session.user_id, 6);

    let uri = format!("/transactions/user/{}?type=deposit", session.user_id);
    let resp = app.oneshot(session.request("GET", &uri, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["limit"], 50);
    assert!(json["items"]
        .as_array()
        .unwrap()
        .iter()
        .all(|tx| tx["type"] == "deposit"));
}

#[tokio::test]
async fn other_users_history_is_forbidden() {
    let (state, app) = demo();
    let other = state.seed_user("bo", "bo@example.com", "secret1");
    let session = login(&app).await;
    let resp = app
        .oneshot(session.request("GET", &format!("/transactions/user/{other}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deposit_then_export_csv() {
    let (_, app) = demo();
    let session = login(&app).await;
    let resp = app
        .clone()
        .oneshot(session.csrf_request("POST", "/transactions/deposit", r#"{"amountUSD":40}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let uri = format!("/transactions/user/{}/export", session.user_id);
    let resp = app.oneshot(session.request("GET", &uri, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let body = body_bytes(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("timestamp,type,status,amountUSD,amountTokens,paymentProvider,externalId")
    );
    assert!(lines.next().unwrap().contains(",deposit,completed,40,"));
}

#[tokio::test]
async fn wallet_summary_nets_deposits_and_withdrawals() {
    let (state, app) = demo();
    let session = login(&app).await;
    state.seed_transactions(&session.user_id, 2);
    let uri = format!("/wallet/summary/{}", session.user_id);
    let resp = app.oneshot(session.request("GET", &uri, "")).await.unwrap();
    let json: Value = body_json(resp).await;
    assert_eq!(json["balanceUSD"], -10.0);
    assert_eq!(json["transactionCount"], 2);
}

#[tokio::test]
async fn hits_are_counted_per_path() {
    let (state, app) = demo();
    let _ = login(&app).await;
    assert_eq!(state.hits("/auth/login"), 1);
    assert_eq!(state.hits("/bets/markets"), 0);
}
