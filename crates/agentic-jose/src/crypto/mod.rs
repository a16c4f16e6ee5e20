//! Cryptographic layer: primitive adapters, the adapter registry, keyed
//! operations and pairwise derivation.
//!
//! Uses pure-Rust primitives:
//! - secp256k1 ECDSA: k256
//! - Ed25519: ed25519-dalek
//! - RSA PKCS#1 v1.5 / OAEP: rsa
//! - AES-GCM: aes-gcm
//! - HMAC / SHA-2: hmac + sha2

pub mod adapter;
pub mod encryption;
pub mod factory;
pub mod keys;
pub mod operations;
pub mod pairwise;
pub mod random;
pub mod signing;
pub mod software;

pub use adapter::{CryptoKey, PrimitiveAdapter};
pub use factory::{CapabilityKind, CryptoFactory, KeyScope, Registration, ANY_ALGORITHM};
pub use keys::KeyGenParams;
pub use pairwise::PairwiseSession;
pub use software::SoftwareAdapter;
