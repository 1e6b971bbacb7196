// src/services/mod.rs

//! Collaborators the watcher talks to.
//!
//! - `status`: fetches the server's status feeds
//! - `delivery`: posts and purges notifications

pub mod delivery;
pub mod status;

pub use delivery::{
    ChannelKind, Destination, DestinationFilter, LogNotifier, Notifier, Presence, PurgeWindow,
    WebhookNotifier,
};
pub use status::{HttpStatusSource, RawStatus, StatusSource};
