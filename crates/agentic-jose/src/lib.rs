//! AgenticJose: JOSE token engine with deterministic pairwise keys.
//!
//! Provides signed (JWS) and encrypted (JWE) tokens in all three JOSE
//! serializations, an adapter registry that routes every primitive
//! operation by algorithm, key scope and storage class, and reproducible
//! per-relationship key derivation from a master seed.

pub mod algorithms;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod jose;
pub mod keys;
pub mod store;

// Re-export primary types
pub use config::JoseConfig;
pub use error::{JoseError, Result};
pub use jose::{
    Header, JweEncryptOptions, JweToken, JwsSignOptions, JwsToken, ProtectedHeader, TokenFormat,
};
pub use keys::{Jwk, KeyContainer, KeyReference, KeyStoreClass, KeyType};

// Re-export crypto types
pub use algorithms::{AlgorithmDescriptor, HashAlgorithm, NamedCurve};
pub use crypto::{
    CapabilityKind, CryptoFactory, CryptoKey, KeyGenParams, KeyScope, PairwiseSession,
    PrimitiveAdapter, Registration, SoftwareAdapter,
};

// Re-export store types
pub use store::{FileKeyStore, KeyListItem, KeyStore, KeyStoreOptions, MemoryKeyStore};
