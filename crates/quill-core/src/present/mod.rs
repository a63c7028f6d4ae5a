//! Presentation mapper: classified records to platform-notification payloads.
//!
//! Pure functions only. Deep links are emitted as requests for the external
//! link resolver; which third-party front end they open is a user preference
//! this module knows nothing about.

use regex::Regex;

use crate::models::{AccountRef, NotificationKind, NotificationRecord};
use crate::util::snippet;

const BODY_MAX_CHARS: usize = 140;

/// Link-resolution request handed to the external resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    /// Open a piece of content (post, comment, quote, group page)
    Content {
        kind: NotificationKind,
        id: String,
    },
    /// Open an account profile by handle or address
    Account { handle: String },
    /// Open the notification inbox
    Inbox,
}

/// Everything the platform-notification collaborator needs to draw one
/// notification; the platform owns the actual rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub require_interaction: bool,
    pub deep_link: DeepLink,
}

/// Map one record to a presentable payload.
#[must_use]
pub fn notification_payload(record: &NotificationRecord) -> NotificationPayload {
    NotificationPayload {
        title: title_for(record),
        body: body_for(record),
        icon: record
            .actor
            .as_ref()
            .and_then(|actor| actor.avatar.clone()),
        require_interaction: matches!(
            record.kind,
            NotificationKind::Comment | NotificationKind::Mention | NotificationKind::Quote
        ),
        deep_link: deep_link_for(record),
    }
}

/// One summary payload for a non-empty poll delta.
#[must_use]
pub fn grouped_payload(delta: &[NotificationRecord]) -> NotificationPayload {
    let actors: Vec<String> = delta
        .iter()
        .filter_map(|record| record.actor.as_ref().map(AccountRef::label))
        .take(3)
        .collect();

    NotificationPayload {
        title: if delta.len() == 1 {
            "1 new notification".to_string()
        } else {
            format!("{} new notifications", delta.len())
        },
        body: actors.join(", "),
        icon: None,
        require_interaction: false,
        deep_link: DeepLink::Inbox,
    }
}

fn title_for(record: &NotificationRecord) -> String {
    let who = record
        .actor
        .as_ref()
        .map_or_else(|| "Someone".to_string(), AccountRef::label);
    let phrase = action_phrase(record);

    if record.is_grouped() {
        let others = record.batch_members.len() - 1;
        let noun = if others == 1 { "other" } else { "others" };
        format!("{who} and {others} {noun} {phrase}")
    } else {
        format!("{who} {phrase}")
    }
}

fn action_phrase(record: &NotificationRecord) -> String {
    match record.kind {
        NotificationKind::Comment => "commented on your post".to_string(),
        NotificationKind::Mention => "mentioned you".to_string(),
        NotificationKind::Repost => "reposted your post".to_string(),
        NotificationKind::Quote => "quoted your post".to_string(),
        NotificationKind::Follow => {
            let mutual = !record.is_grouped()
                && record
                    .actor
                    .as_ref()
                    .is_some_and(|actor| actor.followed_by_viewer);
            if mutual {
                "followed you back".to_string()
            } else {
                "followed you".to_string()
            }
        }
        NotificationKind::Reaction => "reacted to your post".to_string(),
        NotificationKind::PostAction => aggregated_action(record).map_or_else(
            || "acted on your post".to_string(),
            |action| match action {
                "collect" => "collected your post".to_string(),
                "tip" => "tipped your post".to_string(),
                other => format!("performed \"{other}\" on your post"),
            },
        ),
        NotificationKind::AccountAction => aggregated_action(record).map_or_else(
            || "acted on your account".to_string(),
            |action| match action {
                "tip" => "tipped you".to_string(),
                other => format!("performed \"{other}\" on your account"),
            },
        ),
        NotificationKind::GroupApproved => "approved your group membership".to_string(),
        NotificationKind::GroupRejected => "declined your group membership".to_string(),
        // Never presented; kept total so callers need no special case
        NotificationKind::Unknown => "sent you a notification".to_string(),
    }
}

/// The single sub-kind shared by every batch member, if there is one.
fn aggregated_action(record: &NotificationRecord) -> Option<&str> {
    let mut shared: Option<&str> = None;
    for member in &record.batch_members {
        let action = member.sub_kind.as_deref()?;
        match shared {
            None => shared = Some(action),
            Some(existing) if existing == action => {}
            Some(_) => return None,
        }
    }
    shared
}

fn body_for(record: &NotificationRecord) -> String {
    record
        .preview
        .as_deref()
        .map(|text| snippet(&strip_markdown(text), BODY_MAX_CHARS))
        .unwrap_or_default()
}

fn deep_link_for(record: &NotificationRecord) -> DeepLink {
    match record.kind {
        NotificationKind::Follow | NotificationKind::AccountAction => {
            match record.actor.as_ref() {
                Some(actor) => DeepLink::Account {
                    handle: actor
                        .username
                        .clone()
                        .unwrap_or_else(|| actor.address.clone()),
                },
                None => DeepLink::Inbox,
            }
        }
        _ => match record.related_content.clone() {
            Some(id) => DeepLink::Content {
                kind: record.kind,
                id,
            },
            None => DeepLink::Inbox,
        },
    }
}

/// Reduce markdown to plain text for one-line notification bodies.
fn strip_markdown(text: &str) -> String {
    let image = Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("Invalid regex");
    let link = Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("Invalid regex");
    let emphasis = Regex::new(r"[*_~`]+").expect("Invalid regex");
    let heading = Regex::new(r"(?m)^#{1,6}\s+").expect("Invalid regex");

    let text = image.replace_all(text, "");
    let text = link.replace_all(&text, "$1");
    let text = heading.replace_all(&text, "");
    let text = emphasis.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
