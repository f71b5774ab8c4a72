//! PlanStore - keyed JSON snapshot store
//!
//! Holds the last generated value for a small, fixed set of keys. Each key
//! maps to a single JSON document on disk; writes replace the whole document.
//!
//! # Layout
//!
//! ```text
//! {store_dir}/
//! ├── .lock              # exclusive writer lock
//! └── {key}.json         # one snapshot per key
//! ```
//!
//! # Example
//!
//! ```ignore
//! use planstore::SnapshotStore;
//!
//! let store = SnapshotStore::open("/tmp/fitcoach")?;
//! store.save("fitness-plan", &snapshot)?;
//! let restored: Option<Snapshot> = store.load("fitness-plan")?;
//! ```

mod store;

pub use store::SnapshotStore;

/// File extension used for snapshot documents
pub const SNAPSHOT_EXT: &str = "json";
