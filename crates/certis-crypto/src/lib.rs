//! Certis Cryptography Library
//!
//! Hashing and signature verification primitives used by the Certis
//! certificate validation stack. Only verification is provided; Certis
//! never holds private keys.

pub mod error;
pub mod hash;
pub mod verify;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use hash::sha1;
pub use verify::{verify_signature, SignatureAlgorithm};
