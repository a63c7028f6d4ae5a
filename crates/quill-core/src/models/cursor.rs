//! Pagination cursor model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque pagination token issued by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PageCursor {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// The two-direction cursor pair persisted with the cache.
///
/// `prev` points at items newer than the cache boundary and only ever moves
/// on polling fetches; `next` points at older items and only ever moves on
/// backfill fetches. Swapping them silently inverts merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPair {
    #[serde(default)]
    pub prev: Option<PageCursor>,
    #[serde(default)]
    pub next: Option<PageCursor>,
}

impl CursorPair {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.prev.is_none() && self.next.is_none()
    }
}

/// Which half of the cursor pair a merge is allowed to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    /// Polling for newer items; new records are prepended
    Prev,
    /// Backfilling older history; new records are appended
    Next,
}

impl fmt::Display for MergeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prev => write!(f, "prev"),
            Self::Next => write!(f, "next"),
        }
    }
}
