use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    /// Shape returned by the auth endpoints.
    pub fn public(&self) -> Value {
        json!({ "id": self.id, "username": self.username, "email": self.email })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    #[serde(rename = "_id")]
    pub id: String,
    pub bet_type: String,
    pub odds: f64,
    pub likes: u64,
    #[serde(rename = "totalStakedUSD")]
    pub total_staked_usd: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    #[serde(rename = "_id")]
    pub id: String,
    pub match_id: String,
    pub title: String,
    pub status: String,
    pub bets: Vec<Bet>,
    pub top_odds: f64,
    #[serde(rename = "totalStakedUSD")]
    pub total_staked_usd: f64,
    pub likes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    pub amount_tokens: f64,
    pub payment_provider: String,
    pub external_id: String,
    pub created_at: String,
}

/// Filters accepted by the transaction history endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TransactionQuery {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.as_ref().is_none_or(|k| *k == tx.kind)
            && self.status.as_ref().is_none_or(|s| *s == tx.status)
            && self.from.as_ref().is_none_or(|f| tx.created_at.as_str() >= f.as_str())
            && self.to.as_ref().is_none_or(|t| tx.created_at.as_str() <= t.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// One page of a cursor-paginated collection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

/// Slice `items` (newest first) relative to `cursor`.
///
/// Forward returns the rows after the cursor, backward the rows before it,
/// both in newest-first order. `nextCursor` is always the last row's id, even
/// on the final page.
pub fn cursor_page<T: Clone>(
    items: &[T],
    id_of: impl Fn(&T) -> &str,
    limit: usize,
    cursor: Option<&str>,
    direction: Direction,
) -> CursorPage<T> {
    let position = cursor.and_then(|c| items.iter().position(|item| id_of(item) == c));
    let (window, has_more): (Vec<T>, bool) = match (direction, position) {
        (Direction::Forward, pos) => {
            let start = pos.map_or(0, |p| p + 1);
            let rest = items.get(start..).unwrap_or_default();
            (rest.iter().take(limit).cloned().collect(), rest.len() > limit)
        }
        (Direction::Backward, Some(pos)) => {
            let before = &items[..pos];
            let start = before.len().saturating_sub(limit);
            (before[start..].to_vec(), start > 0)
        }
        (Direction::Backward, None) => (Vec::new(), false),
    };
    CursorPage {
        next_cursor: window.last().map(|item| id_of(item).to_string()),
        prev_cursor: window.first().map(|item| id_of(item).to_string()),
        items: window,
        has_more,
    }
}

/// In-memory backing data. Collections are kept newest first.
#[derive(Debug, Default)]
pub struct Store {
    pub users: HashMap<String, User>,
    /// auth token -> user id
    pub sessions: HashMap<String, String>,
    /// refresh token -> user id
    pub refresh_tokens: HashMap<String, String>,
    pub markets: Vec<Market>,
    pub transactions: Vec<Transaction>,
    pub hits: HashMap<String, usize>,
    pub refresh_calls: usize,
    pub refresh_disabled: bool,
    sequence: u64,
}

impl Store {
    /// Monotonic, lexically ordered id in the shape of a Mongo ObjectId.
    pub fn next_id(&mut self) -> String {
        self.sequence += 1;
        format!("{:024x}", self.sequence)
    }

    /// Deterministic timestamp: one day per sequence step from 2024-01-01.
    fn timestamp(&self) -> String {
        let day = self.sequence % 28 + 1;
        let month = (self.sequence / 28) % 12 + 1;
        format!("2024-{month:02}-{day:02}T12:00:00.000Z")
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    pub fn create_user(&mut self, username: &str, email: &str, password: &str) -> User {
        let user = User {
            id: self.next_id(),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            bio: None,
            avatar_url: None,
        };
        self.users.insert(user.id.clone(), user.clone());
        user
    }

    /// Issue a fresh auth/refresh token pair for `user_id`.
    pub fn open_session(&mut self, user_id: &str) -> (String, String) {
        let auth = Uuid::new_v4().to_string();
        let refresh = Uuid::new_v4().to_string();
        self.sessions.insert(auth.clone(), user_id.to_string());
        self.refresh_tokens.insert(refresh.clone(), user_id.to_string());
        (auth, refresh)
    }

    pub fn create_market(&mut self, match_id: &str) -> Market {
        let id = self.next_id();
        let bets = ["first_date", "second_date", "relationship"]
            .iter()
            .enumerate()
            .map(|(i, kind)| Bet {
                id: format!("{id}-b{i}"),
                bet_type: kind.to_string(),
                odds: 1.5 + i as f64,
                likes: 0,
                total_staked_usd: 0.0,
            })
            .collect::<Vec<_>>();
        let market = Market {
            top_odds: bets.iter().map(|b| b.odds).fold(0.0, f64::max),
            title: format!("Market for match {match_id}"),
            id,
            match_id: match_id.to_string(),
            status: "open".to_string(),
            bets,
            total_staked_usd: 0.0,
            likes: 0,
        };
        self.markets.insert(0, market.clone());
        market
    }

    /// Add `stake` to bet `bet_id`, returning the updated market.
    pub fn place_stake(&mut self, bet_id: &str, stake: f64) -> Option<Market> {
        let market = self
            .markets
            .iter_mut()
            .find(|m| m.bets.iter().any(|b| b.id == bet_id))?;
        let bet = market.bets.iter_mut().find(|b| b.id == bet_id)?;
        bet.total_staked_usd += stake;
        market.total_staked_usd += stake;
        Some(market.clone())
    }

    pub fn record_transaction(&mut self, user_id: &str, kind: &str, status: &str, amount_usd: f64) -> Transaction {
        let id = self.next_id();
        let tx = Transaction {
            created_at: self.timestamp(),
            external_id: format!("demo_{id}"),
            id,
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            status: status.to_string(),
            amount_usd,
            amount_tokens: amount_usd * 100.0,
            payment_provider: "demo".to_string(),
        };
        self.transactions.insert(0, tx.clone());
        tx
    }

    pub fn user_transactions(&self, user_id: &str, query: &TransactionQuery) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.user_id == user_id && query.matches(tx))
            .cloned()
            .collect()
    }
}

/// Render transactions as the export CSV.
pub fn transactions_csv(transactions: &[Transaction]) -> String {
    let mut csv = String::from("timestamp,type,status,amountUSD,amountTokens,paymentProvider,externalId\n");
    for tx in transactions {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            tx.created_at, tx.kind, tx.status, tx.amount_usd, tx.amount_tokens, tx.payment_provider, tx.external_id
        ));
    }
    csv
}
