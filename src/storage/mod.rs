//! Storage abstractions for watcher state.
//!
//! The only durable record is the last observed [`Snapshot`], kept as a single
//! pretty-printed JSON document that is rewritten after every poll.
//!
//! ## File Layout
//!
//! ```text
//! data/
//! └── db.json               # Last snapshot, including the unreachable flag
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Snapshot;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the stored snapshot, `None` if nothing has been stored yet.
    ///
    /// Fields missing from the stored document take their default values.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
