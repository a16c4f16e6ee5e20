//! In-process adapter backed by pure-Rust primitive crates.

use async_trait::async_trait;

use crate::algorithms::{AlgorithmDescriptor, ImportDescriptor, NamedCurve};
use crate::crypto::adapter::{CryptoKey, PrimitiveAdapter};
use crate::crypto::keys::{self, KeyGenParams};
use crate::crypto::{encryption, signing};
use crate::error::{JoseError, Result};
use crate::keys::Jwk;

/// Adapter that runs every supported algorithm locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareAdapter;

impl SoftwareAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PrimitiveAdapter for SoftwareAdapter {
    fn name(&self) -> &str {
        "software"
    }

    async fn generate_key(&self, params: &KeyGenParams) -> Result<Jwk> {
        keys::generate(params)
    }

    async fn sign(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        signing::sign(algorithm, key.material(), data)
    }

    async fn verify(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        signature: &[u8],
        data: &[u8],
    ) -> Result<bool> {
        signing::verify(algorithm, key.material(), signature, data)
    }

    async fn encrypt(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        encryption::encrypt(algorithm, key.material(), data)
    }

    async fn decrypt(
        &self,
        algorithm: &AlgorithmDescriptor,
        key: &CryptoKey,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        encryption::decrypt(algorithm, key.material(), data)
    }

    async fn digest(&self, algorithm: &AlgorithmDescriptor, data: &[u8]) -> Result<Vec<u8>> {
        match algorithm {
            AlgorithmDescriptor::Digest { hash } => Ok(signing::digest(*hash, data)),
            other => Err(JoseError::UnsupportedAlgorithm(format!(
                "{} is not a digest",
                other.name()
            ))),
        }
    }

    async fn import_key(
        &self,
        algorithm: &ImportDescriptor,
        jwk: &Jwk,
        extractable: bool,
    ) -> Result<CryptoKey> {
        if jwk.kty() != algorithm.key_type {
            return Err(JoseError::InvalidKey(format!(
                "{} import expects a {} key, got {}",
                algorithm.name,
                algorithm.key_type,
                jwk.kty()
            )));
        }
        // Parse once so malformed material fails at import, not mid-operation.
        match jwk {
            Jwk::EcPublic(k) => keys::secp256k1_verifying_key(k).map(drop)?,
            Jwk::EcPrivate(k) => keys::secp256k1_signing_key(k).map(drop)?,
            Jwk::OkpPublic(k) => keys::ed25519_verifying_key(k).map(drop)?,
            Jwk::OkpPrivate(k) => keys::ed25519_signing_key(k).map(drop)?,
            Jwk::RsaPublic(k) => keys::rsa_public_key(k).map(drop)?,
            Jwk::RsaPrivate(k) => keys::rsa_private_key(k).map(drop)?,
            Jwk::Oct(k) if k.k.is_empty() => {
                return Err(JoseError::InvalidKey("empty symmetric key".into()))
            }
            Jwk::Oct(_) => {}
        }
        if let (Some(expected), Some(crv)) = (algorithm.curve, jwk.curve()) {
            if NamedCurve::from_name(crv)? != expected {
                return Err(JoseError::UnsupportedCurve(crv.to_string()));
            }
        }
        Ok(CryptoKey::new(algorithm.clone(), jwk.clone(), extractable))
    }

    async fn export_key(&self, key: &CryptoKey) -> Result<Jwk> {
        if !key.is_extractable() {
            return Err(JoseError::InvalidKey("key is not extractable".into()));
        }
        Ok(key.material().clone())
    }
}
