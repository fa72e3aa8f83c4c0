//! In-memory storage for the key/value server

pub mod keyspace;

// Re-export for convenience
pub use keyspace::{Entry, KeySpace};
