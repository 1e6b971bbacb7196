//! Pipeline stages for one polling cycle.
//!
//! - `normalize`: turn fetched feeds into a snapshot
//! - `diff`: compare two snapshots
//! - `format`: render changes as a notification
//! - `purge`: schedule cleanup of old notifications
//! - `poll`: drive the cycle and own persisted state

pub mod diff;
pub mod format;
pub mod normalize;
pub mod poll;
pub mod purge;

pub use diff::{ChangeSet, diff};
pub use format::format_changes;
pub use normalize::{fetch_and_normalize, normalize};
pub use poll::{CycleReport, Poller, ServerState};
pub use purge::PurgeScheduler;
