//! Response and request DTOs for the dating/betting API.
//!
//! # Design
//! These mirror the server's JSON shapes but are defined independently of
//! the mock server; integration tests catch schema drift. Collections whose
//! item shape the server enriches freely (markets, transactions, profiles)
//! stay `serde_json::Value` so new server fields never break decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Payload;
use crate::error::ClientError;
use crate::json_payload;
use crate::pagination::{CursorPage, OffsetPage};
use crate::registry::{decode_json, FromPayload};

/// Returned by `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: AuthUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes: u64,
    #[serde(default)]
    pub liked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethods {
    pub items: Vec<PaymentMethod>,
}

/// Client secret handed to the payment widget; opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupIntent {
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryFeed {
    pub users: Vec<Value>,
    pub count: u64,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeResult {
    pub success: bool,
    pub matched: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "match", default)]
    pub match_record: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMatches {
    pub matches: Vec<Value>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsPreview {
    pub personalized_odds: f64,
    pub explanation: String,
    pub confidence: f64,
    pub fairness_score: f64,
    #[serde(default)]
    pub factors: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoUpload {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyMatches {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub matches: Vec<String>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    /// ISO-8601 timestamp.
    pub t: String,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSeries {
    pub range: String,
    pub points: Vec<PnlPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Yes,
    No,
    Over,
    Under,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayLeg {
    pub bet_id: String,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParlayMode {
    Power,
    Flex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemoWebhookKind {
    #[serde(rename = "demo.deposit.completed")]
    DepositCompleted,
    #[serde(rename = "demo.withdrawal.completed")]
    WithdrawalCompleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoWebhookData {
    pub user_id: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

json_payload!(
    RegisteredUser,
    LoginResponse,
    OkResponse,
    LikeResponse,
    PaymentMethods,
    SetupIntent,
    DiscoveryFeed,
    SwipeResult,
    ActiveMatches,
    OddsPreview,
    PhotoUpload,
    DummyMatches,
    PnlSeries,
);

impl<T: DeserializeOwned> FromPayload for OffsetPage<T> {
    fn from_payload(payload: &Payload) -> Result<Self, ClientError> {
        decode_json(payload)
    }
}

impl<T: DeserializeOwned> FromPayload for CursorPage<T> {
    fn from_payload(payload: &Payload) -> Result<Self, ClientError> {
        decode_json(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_response_tolerates_missing_optional_fields() {
        let parsed: LoginResponse =
            serde_json::from_value(json!({ "user": { "id": "u1", "username": "ana" } })).unwrap();
        assert_eq!(parsed.user.id, "u1");
        assert!(parsed.user.role.is_none());
    }

    #[test]
    fn swipe_result_reads_match_field() {
        let parsed: SwipeResult = serde_json::from_value(json!({
            "success": true,
            "matched": true,
            "message": "It's a match!",
            "match": { "_id": "m1" }
        }))
        .unwrap();
        assert_eq!(parsed.match_record.unwrap()["_id"], "m1");
    }

    #[test]
    fn webhook_kind_uses_dotted_names() {
        let value = serde_json::to_value(DemoWebhookKind::WithdrawalCompleted).unwrap();
        assert_eq!(value, "demo.withdrawal.completed");
    }

    #[test]
    fn cursor_page_decodes_from_payload() {
        let payload = Payload::Json(json!({
            "items": [{ "_id": "a" }],
            "hasMore": true,
            "nextCursor": "a",
            "prevCursor": "a"
        }));
        let page = CursorPage::<Value>::from_payload(&payload).unwrap();
        assert!(page.has_more());
        assert_eq!(page.next_cursor.as_deref(), Some("a"));
    }

    #[test]
    fn wrong_shape_is_a_parse_error() {
        let payload = Payload::Json(json!({ "unexpected": true }));
        assert!(matches!(PnlSeries::from_payload(&payload), Err(ClientError::Parse(_))));
    }
}
