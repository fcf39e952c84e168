//! Core data model.
//!
//! One entry per idempotency key. An entry has identity (the payload
//! fingerprint recorded when the key was first seen), lifecycle state
//! (in-flight or completed), and an age used only for eviction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Content digest of a request payload.
///
/// Computed once when a key is first observed and immutable for the life of
/// the key; every later request bearing the key is compared against it to
/// detect key reuse with a different body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Digest the raw payload bytes.
    pub fn of(payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 12 hex chars
        write!(f, "{}", &hex::encode(self.0)[..12])
    }
}

// ---------------------------------------------------------------------------
// Operation result
// ---------------------------------------------------------------------------

/// Verbatim outcome of the downstream operation: a status code plus the raw
/// response bytes. Cached as-is and replayed as-is; the engine never
/// interprets or regenerates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub code: u16,
    pub body: Vec<u8>,
}

impl OperationResult {
    pub fn new(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }

    /// Lossy UTF-8 view of the body, for logs and CLI output.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Lifecycle state of an entry. The completed state carries the result, so a
/// result can only be read once the entry is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// First execution has started but not yet settled.
    InFlight,
    /// Execution settled; the result is permanent for this key.
    Completed(OperationResult),
}

impl EntryState {
    /// Terminal means no further transition will happen for this key.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryState::Completed(_))
    }
}

/// One entry per idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Digest of the payload the key was first seen with.
    pub fingerprint: Fingerprint,

    /// Current lifecycle state. Transitions are monotonic:
    /// absent -> InFlight -> Completed, never back.
    pub state: EntryState,

    /// Set on every write; used only for eviction age, never for ordering.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// A freshly claimed entry: execution started, no result yet.
    pub fn in_flight(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            state: EntryState::InFlight,
            created_at: Utc::now(),
        }
    }

    /// A settled entry carrying the operation's verbatim result.
    pub fn completed(fingerprint: Fingerprint, result: OperationResult) -> Self {
        Self {
            fingerprint,
            state: EntryState::Completed(result),
            created_at: Utc::now(),
        }
    }

    /// The cached result, if this entry has settled.
    pub fn result(&self) -> Option<&OperationResult> {
        match &self.state {
            EntryState::Completed(result) => Some(result),
            EntryState::InFlight => None,
        }
    }

    /// Age relative to `now`, for sweep decisions.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}
