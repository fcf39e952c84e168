//! # idemgate
//!
//! Request deduplication engine for keyed write requests.
//!
//! A caller tags each logical request with an idempotency key. The engine
//! guarantees the downstream operation runs at most once per key: retries
//! replay the cached result byte-for-byte, concurrent duplicates park until
//! the original settles, and key reuse with a different payload is rejected.
//! A background sweeper evicts entries past their TTL so the key map cannot
//! grow without bound.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod processor;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use engine::{Coordinator, Outcome, Sweeper};
pub use error::{Error, Result};
pub use model::{Entry, EntryState, Fingerprint, OperationResult};
pub use store::{EntryStore, MemoryStore};
