//! External calendar synchronization.
//!
//! `types` holds the sync-domain value types, `engine` the state machine
//! that pulls events from a provider into the local cache.

pub mod engine;
pub mod types;

pub use engine::{SyncEngine, MAX_SYNC_PAGES};
pub use types::{CachedEvent, EventChange, EventStatus, SyncResult, SyncState};

#[cfg(test)]
mod engine_tests;
