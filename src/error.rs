//! Error types for loner.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Payload args are missing, not an array, or lack the `unique_key` entry.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Job type identifier does not resolve to a registered type.
    /// Callers in the lock path convert this into the non-unique default.
    #[error("unresolvable job type: {0}")]
    UnresolvableType(String),

    #[error("lock store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
