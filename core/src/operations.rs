//! Typed arguments for every registry operation.
//!
//! Path parameters of mutations are `#[serde(skip)]` so `json_body(self)`
//! sends only the body fields; query argument structs serialize in full
//! because that serialization is their cache key.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::http::{FormPart, RequestBody};
use crate::pagination::{CursorPage, CursorParams, OffsetPage, OffsetParams, QueryParams, TransactionFilter};
use crate::registry::{json_body, Endpoint};
use crate::tags::{EntityTag, TagType};
use crate::types::*;

/// Transaction history pages default to 50 rows.
pub const TRANSACTIONS_DEFAULT_LIMIT: u32 = 50;
pub const DISCOVERY_DEFAULT_LIMIT: u32 = 20;
pub const DISCOVERY_DEFAULT_MAX_DISTANCE: u32 = 50;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Register {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Endpoint for Register {
    type Output = RegisteredUser;
    const NAME: &'static str = "register";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl Endpoint for Login {
    type Output = LoginResponse;
    const NAME: &'static str = "login";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }
}

/// Ends the session. Everything cached belonged to it.
#[derive(Debug, Clone, Serialize)]
pub struct Logout;

impl Endpoint for Logout {
    type Output = OkResponse;
    const NAME: &'static str = "logout";

    fn invalidates(&self) -> Vec<EntityTag> {
        TagType::ALL.into_iter().map(EntityTag::all).collect()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GetUser {
    pub id: String,
}

impl Endpoint for GetUser {
    type Output = Value;
    const NAME: &'static str = "getUser";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone())]
    }

    fn provides(&self) -> Vec<EntityTag> {
        vec![EntityTag::scoped(TagType::User, &self.id)]
    }
}

/// Partial profile update; only the fields present in `changes` are sent.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateUser {
    #[serde(skip)]
    pub id: String,
    #[serde(flatten)]
    pub changes: Map<String, Value>,
}

impl Endpoint for UpdateUser {
    type Output = Value;
    const NAME: &'static str = "updateUser";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone())]
    }

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::scoped(TagType::User, &self.id)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadPhoto {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Endpoint for UploadPhoto {
    type Output = PhotoUpload;
    const NAME: &'static str = "uploadPhoto";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        Ok(Some(RequestBody::Multipart(vec![FormPart {
            name: "photo".to_string(),
            file_name: Some(self.file_name.clone()),
            content_type: Some(self.content_type.clone()),
            data: self.data.clone().into(),
        }])))
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreateMatch {
    #[serde(rename = "userA")]
    pub user_a: String,
    #[serde(rename = "userB")]
    pub user_b: String,
}

impl Endpoint for CreateMatch {
    type Output = Value;
    const NAME: &'static str = "createMatch";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Match)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetMatch {
    pub id: String,
}

impl Endpoint for GetMatch {
    type Output = Value;
    const NAME: &'static str = "getMatch";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone())]
    }

    fn provides(&self) -> Vec<EntityTag> {
        vec![EntityTag::scoped(TagType::Match, &self.id)]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(skip)]
    pub match_id: String,
    pub message_text: String,
}

impl Endpoint for SendMessage {
    type Output = Value;
    const NAME: &'static str = "sendMessage";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("matchId", self.match_id.clone())]
    }

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::scoped(TagType::Match, &self.match_id)]
    }
}

// ---------------------------------------------------------------------------
// Bets / markets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarket {
    pub match_id: String,
}

impl Endpoint for CreateMarket {
    type Output = Value;
    const NAME: &'static str = "createMarket";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Market), EntityTag::all(TagType::Bet)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetMarket {
    pub id: String,
}

impl Endpoint for GetMarket {
    type Output = Value;
    const NAME: &'static str = "getMarket";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone())]
    }

    fn provides(&self) -> Vec<EntityTag> {
        vec![EntityTag::scoped(TagType::Market, &self.id)]
    }
}

/// Market rows embed bet statistics, so market lists also depend on `Bet`.
fn market_list_tags() -> Vec<EntityTag> {
    vec![EntityTag::all(TagType::Market), EntityTag::all(TagType::Bet)]
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListMarkets {
    #[serde(flatten)]
    pub page: OffsetParams,
}

impl Endpoint for ListMarkets {
    type Output = OffsetPage<Value>;
    const NAME: &'static str = "listMarkets";

    fn query(&self) -> QueryParams {
        self.page.to_query()
    }

    fn provides(&self) -> Vec<EntityTag> {
        market_list_tags()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListMarketsCursor {
    #[serde(flatten)]
    pub page: CursorParams,
}

impl Endpoint for ListMarketsCursor {
    type Output = CursorPage<Value>;
    const NAME: &'static str = "listMarketsCursor";

    fn query(&self) -> QueryParams {
        self.page.to_query()
    }

    fn provides(&self) -> Vec<EntityTag> {
        market_list_tags()
    }
}

/// Stake on one bet. Exactly which stake field the server reads depends on
/// the deployment, so each is optional and omitted when unset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaceBet {
    #[serde(skip)]
    pub bet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stake: Option<f64>,
    #[serde(rename = "stakeTokens", skip_serializing_if = "Option::is_none")]
    pub stake_tokens: Option<f64>,
    #[serde(rename = "stakeUSD", skip_serializing_if = "Option::is_none")]
    pub stake_usd: Option<f64>,
}

impl PlaceBet {
    pub fn new(bet_id: impl Into<String>, stake: f64) -> Self {
        Self {
            bet_id: bet_id.into(),
            stake: Some(stake),
            ..Self::default()
        }
    }
}

impl Endpoint for PlaceBet {
    type Output = Value;
    const NAME: &'static str = "placeBet";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("betId", self.bet_id.clone())]
    }

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Bet)]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParlay {
    pub legs: Vec<ParlayLeg>,
    #[serde(rename = "stakeUSD")]
    pub stake_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ParlayMode>,
}

impl Endpoint for CreateParlay {
    type Output = Value;
    const NAME: &'static str = "createParlay";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Bet)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeBet {
    pub bet_id: String,
}

impl Endpoint for LikeBet {
    type Output = LikeResponse;
    const NAME: &'static str = "likeBet";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("betId", self.bet_id.clone())]
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Market)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeMarket {
    pub market_id: String,
}

impl Endpoint for LikeMarket {
    type Output = LikeResponse;
    const NAME: &'static str = "likeMarket";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("marketId", self.market_id.clone())]
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Market)]
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

fn transaction_tags(user_id: &str) -> Vec<EntityTag> {
    vec![EntityTag::scoped(TagType::Transaction, user_id)]
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUserTransactions {
    pub user_id: String,
    #[serde(flatten)]
    pub page: OffsetParams,
    #[serde(flatten)]
    pub filter: TransactionFilter,
}

impl GetUserTransactions {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            page: OffsetParams::new(1, TRANSACTIONS_DEFAULT_LIMIT),
            filter: TransactionFilter::default(),
        }
    }
}

impl Endpoint for GetUserTransactions {
    type Output = OffsetPage<Value>;
    const NAME: &'static str = "getUserTransactions";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("userId", self.user_id.clone())]
    }

    fn query(&self) -> QueryParams {
        self.filter.apply(self.page.to_query())
    }

    fn provides(&self) -> Vec<EntityTag> {
        transaction_tags(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUserTransactionsCursor {
    pub user_id: String,
    #[serde(flatten)]
    pub page: CursorParams,
    #[serde(flatten)]
    pub filter: TransactionFilter,
}

impl GetUserTransactionsCursor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            page: CursorParams::default(),
            filter: TransactionFilter::default(),
        }
    }
}

impl Endpoint for GetUserTransactionsCursor {
    type Output = CursorPage<Value>;
    const NAME: &'static str = "getUserTransactionsCursor";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("userId", self.user_id.clone())]
    }

    fn query(&self) -> QueryParams {
        self.filter.apply(self.page.to_query())
    }

    fn provides(&self) -> Vec<EntityTag> {
        transaction_tags(&self.user_id)
    }
}

/// CSV export of the filtered history; the body is returned as raw bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ExportTransactions {
    pub user_id: String,
    #[serde(flatten)]
    pub filter: TransactionFilter,
}

impl Endpoint for ExportTransactions {
    type Output = bytes::Bytes;
    const NAME: &'static str = "exportTransactions";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("userId", self.user_id.clone())]
    }

    fn query(&self) -> QueryParams {
        self.filter.apply(QueryParams::new())
    }

    fn provides(&self) -> Vec<EntityTag> {
        transaction_tags(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPaymentMethods;

impl Endpoint for ListPaymentMethods {
    type Output = PaymentMethods;
    const NAME: &'static str = "listPaymentMethods";
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSetupIntent;

impl Endpoint for CreateSetupIntent {
    type Output = SetupIntent;
    const NAME: &'static str = "createSetupIntent";
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletePaymentMethod {
    pub id: String,
}

impl Endpoint for DeletePaymentMethod {
    type Output = OkResponse;
    const NAME: &'static str = "deletePaymentMethod";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.clone())]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDeposit {
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
}

impl Endpoint for CreateDeposit {
    type Output = Value;
    const NAME: &'static str = "createDeposit";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Transaction)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWithdraw {
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
}

impl Endpoint for CreateWithdraw {
    type Output = Value;
    const NAME: &'static str = "createWithdraw";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Transaction)]
    }
}

/// Simulates the payment provider's completion callback in demo deployments.
#[derive(Debug, Clone, Serialize)]
pub struct SendDemoWebhook {
    #[serde(rename = "type")]
    pub kind: DemoWebhookKind,
    pub data: DemoWebhookData,
}

impl Endpoint for SendDemoWebhook {
    type Output = Value;
    const NAME: &'static str = "sendDemoWebhook";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        transaction_tags(&self.data.user_id)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDiscoveryFeed {
    pub limit: u32,
    pub max_distance: u32,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
}

impl Default for GetDiscoveryFeed {
    fn default() -> Self {
        Self {
            limit: DISCOVERY_DEFAULT_LIMIT,
            max_distance: DISCOVERY_DEFAULT_MAX_DISTANCE,
            age_min: None,
            age_max: None,
        }
    }
}

impl Endpoint for GetDiscoveryFeed {
    type Output = DiscoveryFeed;
    const NAME: &'static str = "getDiscoveryFeed";

    fn query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push("maxDistance", self.max_distance)
            .push_opt("ageMin", self.age_min)
            .push_opt("ageMax", self.age_max)
    }

    fn provides(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::User)]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    pub target_user_id: String,
    pub action: SwipeAction,
}

impl Endpoint for Swipe {
    type Output = SwipeResult;
    const NAME: &'static str = "swipe";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Match)]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetActiveMatches;

impl Endpoint for GetActiveMatches {
    type Output = ActiveMatches;
    const NAME: &'static str = "getActiveMatches";

    fn provides(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Match)]
    }
}

/// Read-only on the server but sent as POST, so it is not cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOddsPreview {
    pub match_id: String,
    pub bet_type: String,
}

impl Endpoint for GetOddsPreview {
    type Output = OddsPreview;
    const NAME: &'static str = "getOddsPreview";

    fn body(&self) -> Result<Option<RequestBody>, ClientError> {
        json_body(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDummyMatches;

impl Endpoint for CreateDummyMatches {
    type Output = DummyMatches;
    const NAME: &'static str = "createDummyMatches";

    fn invalidates(&self) -> Vec<EntityTag> {
        vec![EntityTag::all(TagType::Match)]
    }
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GetWalletSummary {
    pub user_id: String,
}

impl Endpoint for GetWalletSummary {
    type Output = Value;
    const NAME: &'static str = "getWalletSummary";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("userId", self.user_id.clone())]
    }

    fn provides(&self) -> Vec<EntityTag> {
        transaction_tags(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetWalletPnl {
    pub user_id: String,
    /// `7d`, `30d`, `90d`, `ytd` or `all`; the server defaults to `30d`.
    pub range: String,
}

impl Endpoint for GetWalletPnl {
    type Output = PnlSeries;
    const NAME: &'static str = "getWalletPnl";

    fn path_params(&self) -> Vec<(&'static str, String)> {
        vec![("userId", self.user_id.clone())]
    }

    fn query(&self) -> QueryParams {
        QueryParams::new().push_opt("range", Some(self.range.as_str()))
    }

    fn provides(&self) -> Vec<EntityTag> {
        transaction_tags(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::pagination::Direction;
    use crate::registry::{build_request, descriptor, OperationKind};

    fn body_json(body: &Option<RequestBody>) -> Value {
        serde_json::from_str(body.as_ref().unwrap().as_json().unwrap()).unwrap()
    }

    #[test]
    fn place_bet_posts_stake_only() {
        let req = build_request(&PlaceBet::new("b1", 25.0)).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/bets/b1/place");
        assert_eq!(body_json(&req.body), serde_json::json!({ "stake": 25.0 }));
        assert_eq!(PlaceBet::new("b1", 25.0).invalidates(), vec![EntityTag::all(TagType::Bet)]);
    }

    #[test]
    fn transactions_cursor_without_cursor() {
        let args = GetUserTransactionsCursor {
            user_id: "u1".to_string(),
            page: CursorParams {
                limit: 20,
                cursor: None,
                direction: Direction::Forward,
            },
            filter: TransactionFilter::default(),
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.path_and_query(), "/transactions/user/u1/cursor?limit=20&direction=forward");
    }

    #[test]
    fn transactions_offset_defaults_and_partial_filters() {
        let mut args = GetUserTransactions::new("u1");
        args.filter.status = Some("completed".to_string());
        args.filter.kind = Some(String::new());
        let req = build_request(&args).unwrap();
        assert_eq!(req.path_and_query(), "/transactions/user/u1?page=1&limit=50&status=completed");
    }

    #[test]
    fn export_without_filters_has_no_query() {
        let args = ExportTransactions {
            user_id: "u1".to_string(),
            filter: TransactionFilter::default(),
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.path_and_query(), "/transactions/user/u1/export");
    }

    #[test]
    fn list_markets_defaults() {
        let req = build_request(&ListMarkets::default()).unwrap();
        assert_eq!(req.path_and_query(), "/bets/markets?page=1&limit=20");
        assert!(req.body.is_none());
    }

    #[test]
    fn markets_cursor_with_cursor_and_direction() {
        let args = ListMarketsCursor {
            page: CursorParams {
                limit: 10,
                cursor: Some("abc".to_string()),
                direction: Direction::Backward,
            },
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.path_and_query(), "/bets/markets/cursor?limit=10&direction=backward&cursor=abc");
    }

    #[test]
    fn discovery_feed_omits_absent_age_bounds() {
        let req = build_request(&GetDiscoveryFeed::default()).unwrap();
        assert_eq!(req.path_and_query(), "/discovery/feed?limit=20&maxDistance=50");
        let args = GetDiscoveryFeed {
            age_min: Some(25),
            ..GetDiscoveryFeed::default()
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.path_and_query(), "/discovery/feed?limit=20&maxDistance=50&ageMin=25");
    }

    #[test]
    fn update_user_sends_changes_and_invalidates_that_user() {
        let mut changes = Map::new();
        changes.insert("bio".to_string(), Value::from("hi"));
        let args = UpdateUser {
            id: "u7".to_string(),
            changes,
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "/users/u7");
        assert_eq!(body_json(&req.body), serde_json::json!({ "bio": "hi" }));
        assert_eq!(args.invalidates(), vec![EntityTag::scoped(TagType::User, "u7")]);
    }

    #[test]
    fn send_message_body_excludes_match_id() {
        let args = SendMessage {
            match_id: "m1".to_string(),
            message_text: "hey".to_string(),
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.path, "/matches/m1/message");
        assert_eq!(body_json(&req.body), serde_json::json!({ "messageText": "hey" }));
    }

    #[test]
    fn upload_photo_is_multipart() {
        let args = UploadPhoto {
            file_name: "me.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8],
        };
        let req = build_request(&args).unwrap();
        match req.body {
            Some(RequestBody::Multipart(parts)) => {
                assert_eq!(parts.len(), 1);
                assert_eq!(parts[0].file_name.as_deref(), Some("me.jpg"));
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[test]
    fn delete_payment_method_uses_delete() {
        let req = build_request(&DeletePaymentMethod {
            id: "pm_demo_visa_4242".to_string(),
        })
        .unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "/transactions/payment-methods/pm_demo_visa_4242");
    }

    #[test]
    fn logout_invalidates_every_tag_type() {
        let tags = Logout.invalidates();
        assert_eq!(tags.len(), TagType::ALL.len());
        assert!(tags.iter().all(|t| t.id.is_none()));
    }

    #[test]
    fn wallet_pnl_encodes_range() {
        let args = GetWalletPnl {
            user_id: "u1".to_string(),
            range: "30d".to_string(),
        };
        let req = build_request(&args).unwrap();
        assert_eq!(req.path_and_query(), "/wallet/pnl/u1?range=30d");
        assert_eq!(descriptor(GetWalletPnl::NAME).unwrap().kind, OperationKind::Query);
    }
}
