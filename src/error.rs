//! Error types for idemgate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No idempotency key supplied. Checked before any store access.
    #[error("missing idempotency key")]
    InvalidKey,

    /// Key reuse with a payload that does not match the first-seen one.
    /// Permanent for the key's lifetime; the original result stands.
    #[error("idempotency key {key} already used with a different payload")]
    Conflict { key: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
