//! Entry storage: the one shared mutable resource in the engine.
//!
//! All access to the key map goes through the [`EntryStore`] contract; no
//! caller ever holds a reference into the map across a suspension point.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::model::Entry;

/// Pluggable store for idempotency entries.
///
/// The engine ships with [`MemoryStore`]; an alternate backend satisfies the
/// engine's guarantees by honoring this contract, in particular that `set`
/// wakes every waiter on the key and that all operations are serialized with
/// respect to each other.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Non-blocking snapshot read. Never waits on in-flight work.
    fn get(&self, key: &str) -> Option<Entry>;

    /// Atomic claim: insert `entry` only if the key is absent. Returns the
    /// existing entry when present, `None` when the claim succeeded. This is
    /// the single decision point that keeps two racing first requests from
    /// both executing the operation.
    fn insert_if_absent(&self, key: &str, entry: Entry) -> Option<Entry>;

    /// Unconditional upsert. Always a full replace, never a partial
    /// mutation. Wakes all waiters parked on the key.
    fn set(&self, key: &str, entry: Entry);

    /// Park until the entry for `key` is absent or terminal. Returns
    /// immediately if that already holds. Re-checks the entry on every wake,
    /// so spurious wakeups cannot leak a non-terminal entry out.
    async fn wait_until_resolved(&self, key: &str) -> Option<Entry>;

    /// Evict every entry older than the store's TTL. Returns the eviction
    /// count. Pure in-memory work; duration is bounded by entry count.
    fn sweep(&self) -> usize;
}
