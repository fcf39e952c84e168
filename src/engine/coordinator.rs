//! Deduplication coordinator: decides execute / wait / replay / reject.
//!
//! The flow for a request carrying key + payload:
//!  1. No key -> reject before touching the store.
//!  2. Key never seen -> claim it, run the operation once, cache the result.
//!  3. Key in flight -> park until the original settles, replay its result.
//!  4. Key completed, same payload -> replay the cached result instantly.
//!  5. Key reused with a different payload -> conflict, stored result stands.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Entry, EntryState, Fingerprint, OperationResult};
use crate::store::EntryStore;

/// How a request was resolved. Conflict and missing-key cases surface as
/// [`Error`] variants; these are the two success shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// This request ran the downstream operation.
    Executed(OperationResult),
    /// This request got the cached result of an earlier execution.
    Replayed(OperationResult),
}

impl Outcome {
    pub fn result(&self) -> &OperationResult {
        match self {
            Outcome::Executed(result) | Outcome::Replayed(result) => result,
        }
    }

    pub fn into_result(self) -> OperationResult {
        match self {
            Outcome::Executed(result) | Outcome::Replayed(result) => result,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Outcome::Replayed(_))
    }
}

/// Owns the store-mutation protocol. All entry writes happen here, in exactly
/// two places: the in-flight claim and the completed record.
#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn EntryStore>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self { store }
    }

    /// Resolve one request. `operation` is the downstream call; it runs at
    /// most once per key, without the store lock held, and whatever it
    /// produces (error outcomes included) is cached verbatim and replayed on
    /// retries. The engine never retries on the caller's behalf — a fresh
    /// execution attempt needs a fresh key.
    pub async fn handle<F, Fut>(&self, key: &str, payload: &[u8], operation: F) -> Result<Outcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OperationResult>,
    {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let fingerprint = Fingerprint::of(payload);
        let mut operation = Some(operation);

        loop {
            let existing = match self
                .store
                .insert_if_absent(key, Entry::in_flight(fingerprint))
            {
                Some(existing) => existing,
                None => {
                    // Claimed the key: this is the one execution it gets.
                    let op = operation.take().expect("operation already invoked");
                    debug!(%key, %fingerprint, "first sight of key, executing");
                    let result = op().await;
                    self.store
                        .set(key, Entry::completed(fingerprint, result.clone()));
                    info!(%key, code = result.code, "executed and cached");
                    return Ok(Outcome::Executed(result));
                }
            };

            // The first-seen fingerprint is authoritative for the life of the
            // key, so a mismatch is a conflict whether the original is still
            // in flight or long settled. Checking before the wait means a
            // doomed request never parks.
            if existing.fingerprint != fingerprint {
                warn!(%key, "key reused with a different payload");
                return Err(Error::Conflict {
                    key: key.to_string(),
                });
            }

            match existing.state {
                EntryState::Completed(result) => {
                    debug!(%key, "replaying cached result");
                    return Ok(Outcome::Replayed(result));
                }
                EntryState::InFlight => {
                    debug!(%key, "duplicate while in flight, waiting for original");
                    match self.store.wait_until_resolved(key).await {
                        Some(Entry {
                            state: EntryState::Completed(result),
                            ..
                        }) => {
                            info!(%key, "original settled, replaying its result");
                            return Ok(Outcome::Replayed(result));
                        }
                        // Entry swept while we waited: the key's dedup window
                        // is over, treat it as never seen.
                        None => continue,
                        // Contract says the wait only returns terminal
                        // entries; go around and look again regardless.
                        Some(_) => continue,
                    }
                }
            }
        }
    }
}
