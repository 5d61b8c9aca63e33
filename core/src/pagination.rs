//! Pagination strategies: offset/limit and cursor/direction.
//!
//! Both are stateless. Params structs render query pairs; page structs are
//! the response shapes and compute the params for the adjacent page. Absent
//! optional values never reach the wire, not even as empty strings, since
//! the server would treat `type=` as a real filter.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

/// Ordered query pairs with absent-value elision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Append only when `value` is present and renders non-empty.
    pub fn push_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.is_empty() {
                self.0.push((key.to_string(), value));
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Offset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetParams {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl Default for OffsetParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl OffsetParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new().push("page", self.page).push("limit", self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    /// Only some collections report a total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> OffsetPage<T> {
    pub fn has_more(&self) -> bool {
        match self.total {
            Some(total) => u64::from(self.page) * u64::from(self.limit) < total,
            None => self.limit > 0 && self.items.len() as u64 >= u64::from(self.limit),
        }
    }

    pub fn next_params(&self) -> Option<OffsetParams> {
        self.has_more().then(|| OffsetParams::new(self.page + 1, self.limit))
    }

    pub fn total_pages(&self) -> Option<u64> {
        let total = self.total?;
        if self.limit == 0 {
            return None;
        }
        Some(total.div_ceil(u64::from(self.limit)))
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorParams {
    pub limit: u32,
    /// Opaque continuation token; `None` starts at the head of the collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub direction: Direction,
}

impl Default for CursorParams {
    fn default() -> Self {
        Self::first(DEFAULT_LIMIT)
    }
}

impl CursorParams {
    pub fn first(limit: u32) -> Self {
        Self {
            limit,
            cursor: None,
            direction: Direction::Forward,
        }
    }

    pub fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .push("limit", self.limit)
            .push("direction", self.direction)
            .push_opt("cursor", self.cursor.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub prev_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    /// An explicit `hasMore` wins; without one, a forward cursor means more.
    pub fn has_more(&self) -> bool {
        self.has_more
            .unwrap_or_else(|| self.next_cursor.as_deref().is_some_and(|c| !c.is_empty()))
    }

    /// Params for the page after this one in `direction`, or `None` at the end.
    ///
    /// The server echoes boundary ids even on the final page, so `has_more`
    /// is what decides whether a continuation exists.
    pub fn continuation(&self, direction: Direction, limit: u32) -> Option<CursorParams> {
        if !self.has_more() {
            return None;
        }
        let cursor = match direction {
            Direction::Forward => self.next_cursor.as_ref(),
            Direction::Backward => self.prev_cursor.as_ref(),
        }?;
        if cursor.is_empty() {
            return None;
        }
        Some(CursorParams {
            limit,
            cursor: Some(cursor.clone()),
            direction,
        })
    }

    pub fn next_params(&self, limit: u32) -> Option<CursorParams> {
        self.continuation(Direction::Forward, limit)
    }

    /// Params to step back from a forward page. Whether anything lies before
    /// is only known to the server.
    pub fn previous_params(&self, limit: u32) -> Option<CursorParams> {
        let cursor = self.prev_cursor.as_ref().filter(|c| !c.is_empty())?;
        Some(CursorParams {
            limit,
            cursor: Some(cursor.clone()),
            direction: Direction::Backward,
        })
    }
}

/// Walk a cursor collection forward from the head until it is exhausted.
///
/// Fails with `ClientError::Pagination` if the server hands back a cursor it
/// already gave, which would otherwise loop forever.
pub async fn collect_forward<T, F, Fut>(limit: u32, mut fetch: F) -> Result<Vec<T>, ClientError>
where
    F: FnMut(CursorParams) -> Fut,
    Fut: Future<Output = Result<CursorPage<T>, ClientError>>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut params = CursorParams::first(limit);
    loop {
        let page = fetch(params).await?;
        let next = page.next_params(limit);
        items.extend(page.items);
        let Some(next) = next else {
            return Ok(items);
        };
        let cursor = next.cursor.clone().unwrap_or_default();
        if !seen.insert(cursor.clone()) {
            return Err(ClientError::Pagination(format!("cursor {cursor} returned twice")));
        }
        params = next;
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Transaction history filters. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Inclusive lower timestamp bound, ISO-8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Inclusive upper timestamp bound, ISO-8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl TransactionFilter {
    pub fn apply(&self, params: QueryParams) -> QueryParams {
        params
            .push_opt("type", self.kind.as_deref())
            .push_opt("status", self.status.as_deref())
            .push_opt("from", self.from.as_deref())
            .push_opt("to", self.to.as_deref())
    }
}
