//! Error types for AgenticJose.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.

use crate::crypto::factory::{CapabilityKind, KeyScope};

/// Error type covering algorithm routing, key handling and token processing.
#[derive(Debug, thiserror::Error)]
pub enum JoseError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unsupported serialization format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("Unsupported key type for pairwise derivation: {0}")]
    UnsupportedPairwiseKeyType(String),

    #[error("No adapter registered for {kind} {algorithm} ({scope} scope)")]
    NoRegisteredAdapter {
        kind: CapabilityKind,
        algorithm: String,
        scope: KeyScope,
    },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("No algorithm found in {0}")]
    MissingAlgorithm(String),

    #[error("Malformed token: missing {0}")]
    MalformedToken(String),

    #[error("No recipient content encryption key could be unwrapped")]
    ContentKeyUnrecoverable,

    #[error("Format supports a single signature, token has {0}")]
    TooManySignatures(usize),

    #[error("Format supports a single recipient, token has {0}")]
    TooManyRecipients(usize),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cryptographic operation failed: {0}")]
    CryptoFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, JoseError>;
