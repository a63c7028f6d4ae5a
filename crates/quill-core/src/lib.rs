//! quill-core - Notification sync and caching engine for Quill
//!
//! This crate contains the poll-driven synchronization engine used by the
//! extension's background worker: it pulls paginated notification feeds from
//! the remote social-graph API, merges them into a persisted local cache
//! without duplication, classifies the raw payloads into a closed variant
//! set, and turns deltas into platform notifications and an unread badge.
//!
//! The host environment can suspend the worker between activations, so all
//! state that must survive lives behind the injected [`store::KeyValueStore`]
//! collaborator; everything else is reconstructed on wake.

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod present;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod util;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use models::{
    AccountRef, CursorPair, MergeDirection, NotificationKind, NotificationPreferences,
    NotificationRecord, PageCursor,
};
pub use scheduler::Scheduler;
pub use sync::{PollOutcome, SyncDriver};
