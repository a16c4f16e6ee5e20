//! Key material model: JWKs, logical references and versioned containers.

pub mod container;
pub mod jwk;
pub mod reference;

pub use container::KeyContainer;
pub use jwk::{
    EcPrivateJwk, EcPublicJwk, Jwk, KeyMetadata, KeyType, OctJwk, OkpPrivateJwk, OkpPublicJwk,
    RawJwk, RsaPrivateJwk, RsaPublicJwk,
};
pub use reference::{KeyReference, KeyStoreClass};
