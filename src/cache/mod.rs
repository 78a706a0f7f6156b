//! Local notice cache.
//!
//! This module keeps one snapshot per scope in durable key-value storage and
//! decides when that snapshot must be refreshed:
//! - Snapshots hold the fetched notices plus the user's acknowledgment log
//! - Fresh snapshots are served without a network call
//! - Stale snapshots are refreshed by a single fetch per scope, shared by
//!   every concurrent caller
//! - Storage failures degrade to an empty cache, never to an error

mod clock;
mod keys;
mod layer;
mod snapshot;
mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use keys::Scope;
pub use layer::NoticeCache;
pub use snapshot::{AcknowledgmentRecord, CacheSnapshot};
pub use storage::{Backend, KeyValueStore, MemoryStorage, NoopStorage, SnapshotStore, SqliteStorage};
