//! Entity tags: the correlation keys between cached queries and the
//! mutations that make them outdated.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagType {
    User,
    Match,
    Market,
    Bet,
    Transaction,
}

impl TagType {
    pub const ALL: [TagType; 5] = [
        TagType::User,
        TagType::Match,
        TagType::Market,
        TagType::Bet,
        TagType::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::User => "User",
            TagType::Match => "Match",
            TagType::Market => "Market",
            TagType::Bet => "Bet",
            TagType::Transaction => "Transaction",
        }
    }
}

/// A tag type, optionally scoped to one entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityTag {
    pub kind: TagType,
    pub id: Option<String>,
}

impl EntityTag {
    /// Unscoped tag covering every entity of `kind`.
    pub fn all(kind: TagType) -> Self {
        Self { kind, id: None }
    }

    pub fn scoped(kind: TagType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    /// Whether invalidating `other` makes data tagged `self` stale.
    ///
    /// An unscoped invalidation hits every tag of its type. A scoped one hits
    /// the exact entity and the unscoped aggregate, since list views that
    /// contain the entity must refresh too.
    pub fn is_invalidated_by(&self, other: &EntityTag) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.id, &other.id) {
            (_, None) | (None, _) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
        }
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.kind.as_str()),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// True when any provided tag is hit by any invalidated tag.
pub fn intersects(provided: &[EntityTag], invalidated: &[EntityTag]) -> bool {
    provided
        .iter()
        .any(|tag| invalidated.iter().any(|other| tag.is_invalidated_by(other)))
}
