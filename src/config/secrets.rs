//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for the store connection string.

pub use secrecy::{ExposeSecret, SecretString};
