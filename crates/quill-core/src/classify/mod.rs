//! Identity & classification of raw remote notification payloads.
//!
//! This module is the single adapter between the remote API's wire shapes
//! and the engine's `NotificationRecord` model; schema changes on the remote
//! side should only ever touch this file. Classification is a pure total
//! function: every payload maps to exactly one kind, and anything
//! unrecognized degrades to `Unknown` instead of failing the page.

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{AccountRef, BatchMember, NotificationKind, NotificationRecord};

/// Classify a raw payload into a notification record. Never fails.
#[must_use]
pub fn classify(raw: &Value) -> NotificationRecord {
    match serde_json::from_value::<RawNotification>(raw.clone()) {
        Ok(parsed) => parsed.into_record(),
        Err(error) => {
            tracing::debug!("Unrecognized notification payload shape: {error}");
            unknown_record(raw)
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawAccount {
    address: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    followed_by_me: bool,
}

impl From<RawAccount> for AccountRef {
    fn from(raw: RawAccount) -> Self {
        Self {
            address: raw.address,
            username: raw.username,
            display_name: raw.name,
            avatar: raw.picture,
            followed_by_viewer: raw.followed_by_me,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawActor {
    account: RawAccount,
    #[serde(default)]
    action: Option<String>,
}

impl From<RawActor> for BatchMember {
    fn from(raw: RawActor) -> Self {
        Self {
            account: raw.account.into(),
            sub_kind: raw.action,
        }
    }
}

/// The closed set of wire shapes the remote API emits, discriminated by the
/// payload's `type` field. Exhaustively matched in `into_record`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawNotification {
    Comment {
        id: String,
        timestamp: i64,
        by: RawAccount,
        #[serde(default)]
        post: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Mention {
        id: String,
        timestamp: i64,
        by: RawAccount,
        #[serde(default)]
        post: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Quote {
        id: String,
        timestamp: i64,
        by: RawAccount,
        #[serde(default)]
        quote: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Repost {
        id: String,
        timestamp: i64,
        #[serde(default)]
        reposted_by: Vec<RawActor>,
        #[serde(default)]
        post: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    Follow {
        id: String,
        timestamp: i64,
        #[serde(default)]
        followed_by: Vec<RawActor>,
    },
    Reaction {
        id: String,
        timestamp: i64,
        #[serde(default)]
        reacted_by: Vec<RawActor>,
        #[serde(default)]
        post: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    PostAction {
        id: String,
        timestamp: i64,
        #[serde(default)]
        acted_by: Vec<RawActor>,
        #[serde(default)]
        post: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    AccountAction {
        id: String,
        timestamp: i64,
        #[serde(default)]
        acted_by: Vec<RawActor>,
    },
    GroupApproved {
        id: String,
        timestamp: i64,
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        group_name: Option<String>,
        #[serde(default)]
        by: Option<RawAccount>,
    },
    GroupRejected {
        id: String,
        timestamp: i64,
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        group_name: Option<String>,
        #[serde(default)]
        by: Option<RawAccount>,
    },
}

impl RawNotification {
    fn into_record(self) -> NotificationRecord {
        match self {
            Self::Comment {
                id,
                timestamp,
                by,
                post,
                content,
            } => single_actor(NotificationKind::Comment, &id, timestamp, by, post, content),
            Self::Mention {
                id,
                timestamp,
                by,
                post,
                content,
            } => single_actor(NotificationKind::Mention, &id, timestamp, by, post, content),
            Self::Quote {
                id,
                timestamp,
                by,
                quote,
                content,
            } => single_actor(NotificationKind::Quote, &id, timestamp, by, quote, content),
            Self::Repost {
                id,
                timestamp,
                reposted_by,
                post,
                title,
            } => batched(
                NotificationKind::Repost,
                &id,
                timestamp,
                reposted_by,
                post,
                title,
            ),
            Self::Follow {
                id,
                timestamp,
                followed_by,
            } => batched(
                NotificationKind::Follow,
                &id,
                timestamp,
                followed_by,
                None,
                None,
            ),
            Self::Reaction {
                id,
                timestamp,
                reacted_by,
                post,
                title,
            } => batched(
                NotificationKind::Reaction,
                &id,
                timestamp,
                reacted_by,
                post,
                title,
            ),
            Self::PostAction {
                id,
                timestamp,
                acted_by,
                post,
                title,
            } => batched(
                NotificationKind::PostAction,
                &id,
                timestamp,
                acted_by,
                post,
                title,
            ),
            Self::AccountAction {
                id,
                timestamp,
                acted_by,
            } => batched(
                NotificationKind::AccountAction,
                &id,
                timestamp,
                acted_by,
                None,
                None,
            ),
            Self::GroupApproved {
                id,
                timestamp,
                group,
                group_name,
                by,
            } => group_membership(
                NotificationKind::GroupApproved,
                &id,
                timestamp,
                group,
                group_name,
                by,
            ),
            Self::GroupRejected {
                id,
                timestamp,
                group,
                group_name,
                by,
            } => group_membership(
                NotificationKind::GroupRejected,
                &id,
                timestamp,
                group,
                group_name,
                by,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Record construction
// ---------------------------------------------------------------------------

fn single_actor(
    kind: NotificationKind,
    id: &str,
    timestamp: i64,
    by: RawAccount,
    related: Option<String>,
    preview: Option<String>,
) -> NotificationRecord {
    NotificationRecord {
        identity: NotificationRecord::identity_for(id, timestamp),
        kind,
        occurred_at: timestamp,
        actor: Some(by.into()),
        batch_members: Vec::new(),
        related_content: related,
        preview,
    }
}

fn batched(
    kind: NotificationKind,
    id: &str,
    timestamp: i64,
    actors: Vec<RawActor>,
    related: Option<String>,
    preview: Option<String>,
) -> NotificationRecord {
    let members: Vec<BatchMember> = actors.into_iter().map(Into::into).collect();
    let actor = members.first().map(|member| member.account.clone());
    NotificationRecord {
        identity: NotificationRecord::identity_for(id, timestamp),
        kind,
        occurred_at: timestamp,
        actor,
        batch_members: members,
        related_content: related,
        preview,
    }
}

fn group_membership(
    kind: NotificationKind,
    id: &str,
    timestamp: i64,
    group: Option<String>,
    group_name: Option<String>,
    by: Option<RawAccount>,
) -> NotificationRecord {
    NotificationRecord {
        identity: NotificationRecord::identity_for(id, timestamp),
        kind,
        occurred_at: timestamp,
        actor: by.map(Into::into),
        batch_members: Vec::new(),
        related_content: group,
        preview: group_name,
    }
}

/// Build the `Unknown` record for a payload that did not match any wire
/// shape. Uses whatever id/timestamp fields are present so that re-fetching
/// the same malformed page still de-duplicates; payloads with neither get a
/// content-hash identity.
fn unknown_record(raw: &Value) -> NotificationRecord {
    let remote_id = raw.get("id").and_then(Value::as_str);
    let occurred_at = raw.get("timestamp").and_then(Value::as_i64).unwrap_or(0);
    let identity = remote_id.map_or_else(
        || format!("unknown:{}", content_hash(raw)),
        |id| NotificationRecord::identity_for(id, occurred_at),
    );

    NotificationRecord {
        identity,
        kind: NotificationKind::Unknown,
        occurred_at,
        actor: None,
        batch_members: Vec::new(),
        related_content: None,
        preview: None,
    }
}

fn content_hash(raw: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.to_string().as_bytes());
    let digest = hasher.finalize();
    digest.iter().fold(String::new(), |mut out, byte| {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn classifies_comment_with_related_post() {
        let record = classify(&json!({
            "type": "comment",
            "id": "evt-1",
            "timestamp": 1_700_000_000_000_i64,
            "by": { "address": "0xabc", "username": "alice" },
            "post": "post-9",
            "content": "nice take!"
        }));

        assert_eq!(record.kind, NotificationKind::Comment);
        assert_eq!(record.identity, "evt-1:1700000000000");
        assert_eq!(record.occurred_at, 1_700_000_000_000);
        assert_eq!(record.actor.as_ref().unwrap().username.as_deref(), Some("alice"));
        assert_eq!(record.related_content.as_deref(), Some("post-9"));
        assert_eq!(record.preview.as_deref(), Some("nice take!"));
        assert!(!record.is_grouped());
    }

    #[test]
    fn classifies_batched_follow() {
        let record = classify(&json!({
            "type": "follow",
            "id": "evt-2",
            "timestamp": 5,
            "followed_by": [
                { "account": { "address": "0xa", "name": "Alice" } },
                { "account": { "address": "0xb" } },
                { "account": { "address": "0xc" } },
                { "account": { "address": "0xd" } }
            ]
        }));

        assert_eq!(record.kind, NotificationKind::Follow);
        assert!(record.is_grouped());
        assert_eq!(record.batch_members.len(), 4);
        // First batch member doubles as the headline actor
        assert_eq!(record.actor.unwrap().display_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn single_member_batch_is_not_grouped() {
        let record = classify(&json!({
            "type": "reaction",
            "id": "evt-3",
            "timestamp": 6,
            "reacted_by": [ { "account": { "address": "0xa" } } ],
            "post": "post-1"
        }));

        assert_eq!(record.kind, NotificationKind::Reaction);
        assert!(record.actor.is_some());
        assert_eq!(record.batch_members.len(), 1);
        assert!(!record.is_grouped());
    }

    #[test]
    fn post_action_members_keep_sub_kinds() {
        let record = classify(&json!({
            "type": "post_action",
            "id": "evt-4",
            "timestamp": 7,
            "acted_by": [
                { "account": { "address": "0xa" }, "action": "collect" },
                { "account": { "address": "0xb" }, "action": "collect" }
            ],
            "post": "post-2"
        }));

        assert_eq!(record.kind, NotificationKind::PostAction);
        assert_eq!(
            record
                .batch_members
                .iter()
                .filter_map(|member| member.sub_kind.as_deref())
                .collect::<Vec<_>>(),
            vec!["collect", "collect"]
        );
    }

    #[test]
    fn post_level_events_carry_the_post_title_as_preview() {
        let record = classify(&json!({
            "type": "repost",
            "id": "evt-8",
            "timestamp": 11,
            "reposted_by": [ { "account": { "address": "0xa" } } ],
            "post": "post-3",
            "title": "My collectible"
        }));

        assert_eq!(record.kind, NotificationKind::Repost);
        assert_eq!(record.preview.as_deref(), Some("My collectible"));
    }

    #[test]
    fn group_membership_carries_group_reference() {
        let record = classify(&json!({
            "type": "group_approved",
            "id": "evt-5",
            "timestamp": 8,
            "group": "group-1",
            "group_name": "Rustaceans",
            "by": { "address": "0xmod" }
        }));

        assert_eq!(record.kind, NotificationKind::GroupApproved);
        assert_eq!(record.related_content.as_deref(), Some("group-1"));
        assert_eq!(record.preview.as_deref(), Some("Rustaceans"));
    }

    #[test]
    fn unrecognized_type_degrades_to_unknown() {
        let record = classify(&json!({
            "type": "hologram_wave",
            "id": "evt-6",
            "timestamp": 9
        }));

        assert_eq!(record.kind, NotificationKind::Unknown);
        assert_eq!(record.identity, "evt-6:9");
        assert_eq!(record.occurred_at, 9);
        assert!(record.actor.is_none());
    }

    #[test]
    fn missing_required_fields_degrade_to_unknown() {
        // A comment without its author is malformed, not fatal
        let record = classify(&json!({
            "type": "comment",
            "id": "evt-7",
            "timestamp": 10
        }));
        assert_eq!(record.kind, NotificationKind::Unknown);
        assert_eq!(record.identity, "evt-7:10");
    }

    #[test]
    fn shapeless_payload_gets_stable_hash_identity() {
        let payload = json!({ "totally": "opaque" });
        let first = classify(&payload);
        let second = classify(&payload);

        assert_eq!(first.kind, NotificationKind::Unknown);
        assert!(first.identity.starts_with("unknown:"));
        assert_eq!(first.identity, second.identity);
    }
}
