//! Startup snapshot loading
//!
//! This module parses the on-disk binary dump that seeds the key space at
//! startup. The format carries variable-length size encodings, special
//! integer-string encodings, and per-key expiry markers in millisecond or
//! second precision.

pub mod reader;

// Re-export for convenience
pub use reader::{SnapshotReader, SnapshotRecord, load};
