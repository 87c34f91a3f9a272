//! convoy-state: transactional state store for Convoy.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for deployments, deployment history, processes, route bindings,
//! published route sets, and audit events.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! History keys (`{deployment_id}:{seq}`) enable prefix scans per deployment.
//! Mutations are grouped with [`StateStore::transaction`]: one closure, one
//! redb write transaction, committed or rolled back as a unit.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across threads.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{StateStore, StateTxn};
pub use types::*;

/// Current Unix time in seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
