//! Replication role handling
//!
//! This module tracks the primary/replica identity surfaced via `INFO` and
//! performs the replica's outbound announcement to its primary at startup.

pub mod handshake;
pub mod state;

// Re-export for convenience
pub use state::{ReplicationState, Role};
