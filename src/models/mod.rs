// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the snapshot data model and the configuration
//! structures used throughout the application.

mod config;
mod snapshot;

// Re-export all public types
pub use config::{
    Config, DeliveryConfig, FetchConfig, LoggingConfig, PathsConfig, PollConfig, PurgeConfig,
};
pub use snapshot::{
    CareerSavegame, DLC_PREFIX, ModInfo, ModKind, Player, ServerInfo, Slots, Snapshot,
};
