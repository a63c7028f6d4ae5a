//! Data models shared across the engine.

mod cursor;
mod notification;
mod preferences;

pub use cursor::{CursorPair, MergeDirection, PageCursor};
pub use notification::{AccountRef, BatchMember, NotificationKind, NotificationRecord};
pub use preferences::NotificationPreferences;
