//! Notification record model

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of notification variants the remote API can emit.
///
/// Anything the classifier does not recognize becomes `Unknown`; unknown
/// records are cached (so cursors keep advancing) but never presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Comment,
    Mention,
    Repost,
    Quote,
    Follow,
    Reaction,
    PostAction,
    AccountAction,
    GroupApproved,
    GroupRejected,
    Unknown,
}

impl NotificationKind {
    /// All kinds a user can toggle in preferences.
    pub const USER_VISIBLE: [Self; 10] = [
        Self::Comment,
        Self::Mention,
        Self::Repost,
        Self::Quote,
        Self::Follow,
        Self::Reaction,
        Self::PostAction,
        Self::AccountAction,
        Self::GroupApproved,
        Self::GroupRejected,
    ];

    /// Whether records of this kind may appear in user-facing surfaces.
    #[must_use]
    pub const fn is_presentable(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Comment => "comment",
            Self::Mention => "mention",
            Self::Repost => "repost",
            Self::Quote => "quote",
            Self::Follow => "follow",
            Self::Reaction => "reaction",
            Self::PostAction => "post_action",
            Self::AccountAction => "account_action",
            Self::GroupApproved => "group_approved",
            Self::GroupRejected => "group_rejected",
            Self::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Reference to the account that triggered a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    /// Wallet address of the account
    pub address: String,
    /// Handle, without any namespace prefix
    #[serde(default)]
    pub username: Option<String>,
    /// Free-form display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar image URI
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the signed-in account already follows this actor
    #[serde(default)]
    pub followed_by_viewer: bool,
}

impl AccountRef {
    /// Human-readable label: display name, then handle, then a shortened
    /// wallet address.
    #[must_use]
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name.as_deref() {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
        if let Some(username) = self.username.as_deref() {
            let username = username.trim();
            if !username.is_empty() {
                return format!("@{username}");
            }
        }
        short_address(&self.address)
    }
}

/// One member of a remote-batched notification, with the optional sub-kind
/// of the action it performed (e.g. "collect" vs "tip" for post actions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMember {
    pub account: AccountRef,
    #[serde(default)]
    pub sub_kind: Option<String>,
}

/// One observed notification event.
///
/// Immutable once cached; the remote API does not amend past events. A
/// re-observed remote id with a different event time is a distinct record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Deterministic composite key (`remote-id:occurred-at`), used for
    /// de-duplication across repeated fetches
    pub identity: String,
    pub kind: NotificationKind,
    /// Event time, Unix ms
    pub occurred_at: i64,
    /// Triggering account; absent for unknown-shaped payloads
    #[serde(default)]
    pub actor: Option<AccountRef>,
    /// Actors of a remote-batched action; two or more signals a grouped
    /// notification
    #[serde(default)]
    pub batch_members: Vec<BatchMember>,
    /// Underlying content reference (post/comment id) for deep linking
    #[serde(default)]
    pub related_content: Option<String>,
    /// Raw content text carried alongside the reference, for body snippets
    #[serde(default)]
    pub preview: Option<String>,
}

impl NotificationRecord {
    /// Derive the composite identity for a remote event.
    ///
    /// Combines the remote id with the event time because the same remote id
    /// can legitimately recur with an updated batch size at a later sync.
    #[must_use]
    pub fn identity_for(remote_id: &str, occurred_at: i64) -> String {
        format!("{remote_id}:{occurred_at}")
    }

    /// Whether this record represents a remote-batched group of actions.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.batch_members.len() >= 2
    }
}

/// Shorten a wallet address to `0x1234…abcd` form for display.
#[must_use]
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
