//! The primitive adapter seam.
//!
//! A [`PrimitiveAdapter`] executes raw cryptographic operations for a set of
//! algorithms. The crate ships [`SoftwareAdapter`](super::software::SoftwareAdapter);
//! hardware or vault-backed implementations plug in through the same trait
//! and are registered with the [`CryptoFactory`](super::factory::CryptoFactory).

use async_trait::async_trait;

use crate::algorithms::{AlgorithmDescriptor, ImportDescriptor};
use crate::crypto::keys::KeyGenParams;
use crate::error::Result;
use crate::keys::Jwk;

/// Key material imported for one algorithm family.
///
/// Keys pulled from a key store for private operations are imported as
/// non-extractable; [`PrimitiveAdapter::export_key`] refuses them.
#[derive(Debug, Clone)]
pub struct CryptoKey {
    algorithm: ImportDescriptor,
    material: Jwk,
    extractable: bool,
}

impl CryptoKey {
    pub fn new(algorithm: ImportDescriptor, material: Jwk, extractable: bool) -> Self {
        Self {
            algorithm,
            material,
            extractable,
        }
    }

    pub fn algorithm(&self) -> &ImportDescriptor {
        &self.algorithm
    }

    pub fn material(&self) -> &Jwk {
        &self.material
    }

    pub fn is_extractable(&self) -> bool {
        self.extractable
    }
}

/// Low-level crypto capability, parameterized by algorithm descriptors.
#[async_trait]
pub trait PrimitiveAdapter: Send + Sync {
    /// Human-readable adapter name for diagnostics.
    fn name(&self) -> &str;

    async fn generate_key(&self, params: &KeyGenParams) -> Result<Jwk>;

    async fn sign(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>>;

    /// Returns `Ok(false)` on a signature mismatch.
    async fn verify(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool>;

    async fn encrypt(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>>;

    async fn decrypt(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>>;

    async fn digest(&self, algorithm: &AlgorithmDescriptor, data: &[u8]) -> Result<Vec<u8>>;

    async fn import_key(
        &self,
        algorithm: &ImportDescriptor,
        jwk: &Jwk,
        extractable: bool,
    ) -> Result<CryptoKey>;

    async fn export_key(&self, key: &CryptoKey) -> Result<Jwk>;
}
