//! In-memory stand-in for the dating/betting API.
//!
//! Implements the slice of the wire contract the client core is tested
//! against: cookie sessions with refresh rotation, the CSRF double-submit
//! check, offset and cursor listings, and the transaction CSV export.
//! `AppState` also exposes counters and switches so tests can expire
//! sessions and count requests per path.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

pub mod session;
pub mod store;

use session::{cleared_cookies, cookie, csv_content_type, require_csrf, session_cookies, ApiError, ApiResult, CurrentUser};
use store::{cursor_page, transactions_csv, Direction, Store, TransactionQuery};

pub use store::{Market, Transaction, User};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password123";

const DEFAULT_LIMIT: u32 = 20;
const TRANSACTIONS_DEFAULT_LIMIT: u32 = 50;
const MAX_CURSOR_LIMIT: u32 = 100;

#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A demo user with a few markets and transactions.
    pub fn demo() -> Self {
        let state = Self::new();
        let user_id = state.seed_user("demo", DEMO_EMAIL, DEMO_PASSWORD);
        state.seed_markets(30);
        state.seed_transactions(&user_id, 12);
        state
    }

    pub fn seed_user(&self, username: &str, email: &str, password: &str) -> String {
        self.store.lock().create_user(username, email, password).id
    }

    pub fn seed_markets(&self, count: usize) -> Vec<String> {
        let mut store = self.store.lock();
        (0..count)
            .map(|i| store.create_market(&format!("seed-match-{i}")).id)
            .collect()
    }

    /// Alternating deposits and withdrawals of increasing size.
    pub fn seed_transactions(&self, user_id: &str, count: usize) {
        let mut store = self.store.lock();
        for i in 0..count {
            let kind = if i % 2 == 0 { "deposit" } else { "withdrawal" };
            store.record_transaction(user_id, kind, "completed", 10.0 * (i + 1) as f64);
        }
    }

    /// Drop every auth token; refresh tokens stay valid.
    pub fn expire_sessions(&self) {
        self.store.lock().sessions.clear();
    }

    /// Make every refresh call answer 401.
    pub fn disable_refresh(&self) {
        self.store.lock().refresh_disabled = true;
    }

    pub fn refresh_calls(&self) -> usize {
        self.store.lock().refresh_calls
    }

    pub fn hits(&self, path: &str) -> usize {
        self.store.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub fn first_bet_id(&self) -> Option<String> {
        let store = self.store.lock();
        store.markets.first()?.bets.first().map(|bet| bet.id.clone())
    }
}

pub fn app() -> Router {
    router(AppState::new())
}

pub fn router(state: AppState) -> Router {
    let bets = Router::new()
        .route("/bets/market/create", post(create_market))
        .route("/bets/market/{id}", get(get_market))
        .route("/bets/markets", get(list_markets))
        .route("/bets/markets/cursor", get(list_markets_cursor))
        .route("/bets/{bet_id}/place", post(place_bet))
        .route("/bets/{bet_id}/like", post(like_bet))
        .route_layer(middleware::from_fn(require_csrf));

    let transactions = Router::new()
        .route("/transactions/user/{user_id}", get(list_transactions))
        .route("/transactions/user/{user_id}/cursor", get(list_transactions_cursor))
        .route("/transactions/user/{user_id}/export", get(export_transactions))
        .route("/transactions/deposit", post(deposit))
        .route("/transactions/withdraw", post(withdraw))
        .route_layer(middleware::from_fn(require_csrf));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/users/{id}", get(get_user).put(update_user))
        .route("/wallet/summary/{user_id}", get(wallet_summary))
        .merge(bets)
        .merge(transactions)
        .layer(middleware::from_fn_with_state(state.clone(), count_hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, AppState::demo()).await
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, router(state)).await
}

async fn count_hits(State(state): State<AppState>, request: Request, next: Next) -> Response {
    *state
        .store
        .lock()
        .hits
        .entry(request.uri().path().to_string())
        .or_default() += 1;
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

async fn register(State(state): State<AppState>, Json(input): Json<RegisterInput>) -> ApiResult<Response> {
    if input.username.is_empty() || input.email.is_empty() || input.password.len() < 6 {
        return Err(ApiError::bad_request("Invalid registration data"));
    }
    let mut store = state.store.lock();
    if store.user_by_email(&input.email).is_some() {
        return Err(ApiError(StatusCode::CONFLICT, "Email already registered"));
    }
    let user = store.create_user(&input.username, &input.email, &input.password);
    let (auth, refresh) = store.open_session(&user.id);
    Ok((StatusCode::CREATED, AppendHeaders(session_cookies(&auth, &refresh)), Json(user.public())).into_response())
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginInput>) -> ApiResult<Response> {
    let mut store = state.store.lock();
    let user = store
        .user_by_email(&input.email)
        .filter(|user| user.password == input.password)
        .cloned()
        .ok_or(ApiError(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    let (auth, refresh) = store.open_session(&user.id);
    Ok((AppendHeaders(session_cookies(&auth, &refresh)), Json(json!({ "user": user.public() }))).into_response())
}

/// Rotates both tokens and the CSRF cookie.
async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let mut store = state.store.lock();
    store.refresh_calls += 1;
    if store.refresh_disabled {
        return Err(ApiError::unauthorized());
    }
    let token = cookie(&headers, session::REFRESH_COOKIE).ok_or_else(ApiError::unauthorized)?;
    let user_id = store.refresh_tokens.remove(&token).ok_or_else(ApiError::unauthorized)?;
    let (auth, refresh) = store.open_session(&user_id);
    Ok((AppendHeaders(session_cookies(&auth, &refresh)), Json(json!({ "ok": true }))).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut store = state.store.lock();
    if let Some(token) = cookie(&headers, session::AUTH_COOKIE) {
        store.sessions.remove(&token);
    }
    if let Some(token) = cookie(&headers, session::REFRESH_COOKIE) {
        store.refresh_tokens.remove(&token);
    }
    (AppendHeaders(cleared_cookies()), Json(json!({ "ok": true }))).into_response()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let store = state.store.lock();
    store.users.get(&id).cloned().map(Json).ok_or_else(ApiError::not_found)
}

async fn update_user(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<String>,
    Json(changes): Json<UserChanges>,
) -> ApiResult<Json<User>> {
    if me != id {
        return Err(ApiError(StatusCode::FORBIDDEN, "Forbidden"));
    }
    let mut store = state.store.lock();
    let user = store.users.get_mut(&id).ok_or_else(ApiError::not_found)?;
    if let Some(bio) = changes.bio {
        user.bio = Some(bio);
    }
    if let Some(avatar_url) = changes.avatar_url {
        user.avatar_url = Some(avatar_url);
    }
    Ok(Json(user.clone()))
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct OffsetQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct CursorQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub direction: Direction,
}

impl CursorQuery {
    fn limit(&self) -> ApiResult<usize> {
        match self.limit.unwrap_or(DEFAULT_LIMIT) {
            limit @ 1..=MAX_CURSOR_LIMIT => Ok(limit as usize),
            _ => Err(ApiError::bad_request("Invalid query")),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketInput {
    pub match_id: String,
}

#[derive(Deserialize)]
pub struct StakeInput {
    pub stake: Option<f64>,
    #[serde(rename = "stakeUSD")]
    pub stake_usd: Option<f64>,
    #[serde(rename = "stakeTokens")]
    pub stake_tokens: Option<f64>,
}

async fn create_market(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateMarketInput>,
) -> ApiResult<(StatusCode, Json<Market>)> {
    if input.match_id.is_empty() {
        return Err(ApiError::bad_request("matchId required"));
    }
    let market = state.store.lock().create_market(&input.match_id);
    Ok((StatusCode::CREATED, Json(market)))
}

async fn get_market(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Market>> {
    let store = state.store.lock();
    store
        .markets
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

async fn list_markets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<OffsetQuery>,
) -> Json<Value> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let store = state.store.lock();
    let items: Vec<&Market> = store
        .markets
        .iter()
        .skip(((page - 1) * limit) as usize)
        .take(limit as usize)
        .collect();
    Json(json!({ "items": items, "page": page, "limit": limit }))
}

async fn list_markets_cursor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<CursorQuery>,
) -> ApiResult<Json<store::CursorPage<Market>>> {
    let limit = query.limit()?;
    let store = state.store.lock();
    Ok(Json(cursor_page(
        &store.markets,
        |m| m.id.as_str(),
        limit,
        query.cursor.as_deref(),
        query.direction,
    )))
}

async fn place_bet(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(bet_id): Path<String>,
    Json(input): Json<StakeInput>,
) -> ApiResult<Json<Value>> {
    let stake = input
        .stake_usd
        .or(input.stake)
        .or(input.stake_tokens.map(|tokens| tokens / 100.0))
        .filter(|stake| *stake > 0.0)
        .ok_or(ApiError::bad_request("Stake must be positive"))?;
    let market = state.store.lock().place_stake(&bet_id, stake).ok_or_else(ApiError::not_found)?;
    Ok(Json(json!({ "ok": true, "market": market })))
}

async fn like_bet(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(bet_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock();
    let bet = store
        .markets
        .iter_mut()
        .flat_map(|m| m.bets.iter_mut())
        .find(|b| b.id == bet_id)
        .ok_or_else(ApiError::not_found)?;
    bet.likes += 1;
    Ok(Json(json!({ "likes": bet.likes, "liked": true })))
}

// ---------------------------------------------------------------------------
// Transactions / wallet
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AmountInput {
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
}

fn own_history(me: &str, user_id: &str) -> ApiResult<()> {
    if me == user_id {
        Ok(())
    } else {
        Err(ApiError(StatusCode::FORBIDDEN, "Forbidden"))
    }
}

async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
    Query(page): Query<OffsetQuery>,
    Query(filter): Query<TransactionQuery>,
) -> ApiResult<Json<Value>> {
    own_history(&me, &user_id)?;
    let number = page.page.unwrap_or(1).max(1);
    let limit = page.limit.unwrap_or(TRANSACTIONS_DEFAULT_LIMIT);
    let all = state.store.lock().user_transactions(&user_id, &filter);
    let items: Vec<_> = all
        .iter()
        .skip(((number - 1) * limit) as usize)
        .take(limit as usize)
        .collect();
    Ok(Json(json!({ "items": items, "page": number, "limit": limit, "total": all.len() })))
}

async fn list_transactions_cursor(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
    Query(query): Query<CursorQuery>,
    Query(filter): Query<TransactionQuery>,
) -> ApiResult<Json<store::CursorPage<Transaction>>> {
    own_history(&me, &user_id)?;
    let limit = query.limit()?;
    let all = state.store.lock().user_transactions(&user_id, &filter);
    Ok(Json(cursor_page(
        &all,
        |tx| tx.id.as_str(),
        limit,
        query.cursor.as_deref(),
        query.direction,
    )))
}

async fn export_transactions(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
    Query(filter): Query<TransactionQuery>,
) -> ApiResult<Response> {
    own_history(&me, &user_id)?;
    let all = state.store.lock().user_transactions(&user_id, &filter);
    Ok(([csv_content_type()], transactions_csv(&all)).into_response())
}

async fn deposit(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<AmountInput>,
) -> ApiResult<Json<Value>> {
    record(&state, &me, "deposit", input.amount_usd)
}

async fn withdraw(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<AmountInput>,
) -> ApiResult<Json<Value>> {
    record(&state, &me, "withdrawal", input.amount_usd)
}

fn record(state: &AppState, user_id: &str, kind: &str, amount_usd: f64) -> ApiResult<Json<Value>> {
    if amount_usd <= 0.0 {
        return Err(ApiError::bad_request("Amount must be positive"));
    }
    let tx = state.store.lock().record_transaction(user_id, kind, "completed", amount_usd);
    Ok(Json(json!({ "ok": true, "transaction": tx })))
}

async fn wallet_summary(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    own_history(&me, &user_id)?;
    let all = state
        .store
        .lock()
        .user_transactions(&user_id, &TransactionQuery::default());
    let total = |kind: &str| -> f64 {
        all.iter()
            .filter(|tx| tx.kind == kind && tx.status == "completed")
            .map(|tx| tx.amount_usd)
            .sum()
    };
    let deposited = total("deposit");
    let withdrawn = total("withdrawal");
    Ok(Json(json!({
        "balanceUSD": deposited - withdrawn,
        "totalDepositedUSD": deposited,
        "totalWithdrawnUSD": withdrawn,
        "transactionCount": all.len(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_state_has_a_user_and_markets() {
        let state = AppState::demo();
        let store = state.store.lock();
        assert!(store.user_by_email(DEMO_EMAIL).is_some());
        assert_eq!(store.markets.len(), 30);
        assert_eq!(store.transactions.len(), 12);
    }

    #[test]
    fn first_bet_id_points_at_newest_market() {
        let state = AppState::new();
        let ids = state.seed_markets(2);
        assert!(state.first_bet_id().unwrap().starts_with(&ids[1]));
    }

    #[test]
    fn cursor_limit_bounds() {
        let query = |limit| CursorQuery {
            limit: Some(limit),
            cursor: None,
            direction: Direction::Forward,
        };
        assert!(query(0).limit().is_err());
        assert_eq!(query(100).limit().unwrap(), 100);
        assert!(query(101).limit().is_err());
    }

    #[test]
    fn stake_input_accepts_any_stake_field() {
        let input: StakeInput = serde_json::from_str(r#"{"stakeUSD":5}"#).unwrap();
        assert_eq!(input.stake_usd, Some(5.0));
        let input: StakeInput = serde_json::from_str(r#"{"stake":25}"#).unwrap();
        assert_eq!(input.stake, Some(25.0));
    }
}
