//! Signing and verification over JWK material.
//!
//! Covers ES256K (secp256k1 ECDSA, raw `r || s` signatures), EdDSA
//! (Ed25519), RS256/384/512 (RSASSA-PKCS1-v1_5) and HS256/384/512.
//! Verification reports a mismatch as `Ok(false)`; only structurally
//! unusable keys are errors.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use k256::ecdsa::signature::{Signer, Verifier};
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::algorithms::{AlgorithmDescriptor, HashAlgorithm};
use crate::crypto::keys::{
    ed25519_signing_key, ed25519_verifying_key, rsa_private_key, rsa_public_key,
    secp256k1_signing_key, secp256k1_verifying_key,
};
use crate::error::{JoseError, Result};
use crate::keys::{EcPrivateJwk, Jwk, OkpPrivateJwk, RsaPrivateJwk};

/// Hash `data` with the given algorithm.
pub fn digest(hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Keyed HMAC over `data`.
pub fn hmac(hash: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match hash {
        HashAlgorithm::Sha256 => mac::<Hmac<Sha256>>(key, data),
        HashAlgorithm::Sha384 => mac::<Hmac<Sha384>>(key, data),
        HashAlgorithm::Sha512 => mac::<Hmac<Sha512>>(key, data),
        HashAlgorithm::Sha1 => Err(JoseError::UnsupportedAlgorithm("HMAC SHA-1".into())),
    }
}

fn mac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| JoseError::InvalidKey(format!("HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_matches<M: Mac + KeyInit>(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| JoseError::InvalidKey(format!("HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.verify_slice(tag).is_ok())
}

fn pkcs1v15(hash: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    match hash {
        HashAlgorithm::Sha256 => Ok(Pkcs1v15Sign::new::<Sha256>()),
        HashAlgorithm::Sha384 => Ok(Pkcs1v15Sign::new::<Sha384>()),
        HashAlgorithm::Sha512 => Ok(Pkcs1v15Sign::new::<Sha512>()),
        HashAlgorithm::Sha1 => Err(JoseError::UnsupportedAlgorithm(
            "RSASSA-PKCS1-v1_5 with SHA-1".into(),
        )),
    }
}

fn mismatch(algorithm: &AlgorithmDescriptor, key: &Jwk, operation: &str) -> JoseError {
    JoseError::InvalidKey(format!(
        "{} cannot {operation} with a {} {} key",
        algorithm.name(),
        if key.is_private() { "private" } else { "public" },
        key.kty()
    ))
}

/// Sign `data` with private (or symmetric) key material.
pub fn sign(algorithm: &AlgorithmDescriptor, key: &Jwk, data: &[u8]) -> Result<Vec<u8>> {
    match (algorithm, key) {
        (AlgorithmDescriptor::Ecdsa { hash, .. }, Jwk::EcPrivate(k)) => {
            if *hash != HashAlgorithm::Sha256 {
                return Err(JoseError::UnsupportedAlgorithm(format!("ECDSA with {hash}")));
            }
            let signing_key = secp256k1_signing_key(k)?;
            let signature: k256::ecdsa::Signature = signing_key
                .try_sign(data)
                .map_err(|e| JoseError::CryptoFailure(format!("ECDSA sign: {e}")))?;
            Ok(signature.to_bytes().to_vec())
        }
        (AlgorithmDescriptor::EdDsa { .. }, Jwk::OkpPrivate(k)) => {
            let signing_key = ed25519_signing_key(k)?;
            Ok(signing_key.sign(data).to_bytes().to_vec())
        }
        (AlgorithmDescriptor::RsassaPkcs1V15 { hash }, Jwk::RsaPrivate(k)) => {
            let scheme = pkcs1v15(*hash)?;
            let hashed = digest(*hash, data);
            rsa_private_key(k)?
                .sign(scheme, &hashed)
                .map_err(|e| JoseError::CryptoFailure(format!("RSA sign: {e}")))
        }
        (AlgorithmDescriptor::Hmac { hash }, Jwk::Oct(k)) => hmac(*hash, &k.k, data),
        _ => Err(mismatch(algorithm, key, "sign")),
    }
}

/// Verify `signature` over `data`. A wrong signature yields `Ok(false)`.
pub fn verify(
    algorithm: &AlgorithmDescriptor,
    key: &Jwk,
    signature: &[u8],
    data: &[u8],
) -> Result<bool> {
    match (algorithm, key) {
        (AlgorithmDescriptor::Ecdsa { .. }, Jwk::EcPublic(k))
        | (AlgorithmDescriptor::Ecdsa { .. }, Jwk::EcPrivate(EcPrivateJwk { public: k, .. })) => {
            let verifying_key = secp256k1_verifying_key(k)?;
            let Ok(signature) = k256::ecdsa::Signature::from_slice(signature) else {
                return Ok(false);
            };
            // k256 only accepts low-S; other signers may emit either form.
            let signature = signature.normalize_s().unwrap_or(signature);
            Ok(verifying_key.verify(data, &signature).is_ok())
        }
        (AlgorithmDescriptor::EdDsa { .. }, Jwk::OkpPublic(k))
        | (AlgorithmDescriptor::EdDsa { .. }, Jwk::OkpPrivate(OkpPrivateJwk { public: k, .. })) => {
            let verifying_key = ed25519_verifying_key(k)?;
            let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                return Ok(false);
            };
            Ok(verifying_key.verify(data, &signature).is_ok())
        }
        (AlgorithmDescriptor::RsassaPkcs1V15 { hash }, Jwk::RsaPublic(k))
        | (
            AlgorithmDescriptor::RsassaPkcs1V15 { hash },
            Jwk::RsaPrivate(RsaPrivateJwk { public: k, .. }),
        ) => {
            let scheme = pkcs1v15(*hash)?;
            let hashed = digest(*hash, data);
            Ok(rsa_public_key(k)?.verify(scheme, &hashed, signature).is_ok())
        }
        (AlgorithmDescriptor::Hmac { hash }, Jwk::Oct(k)) => match hash {
            HashAlgorithm::Sha256 => mac_matches::<Hmac<Sha256>>(&k.k, data, signature),
            HashAlgorithm::Sha384 => mac_matches::<Hmac<Sha384>>(&k.k, data, signature),
            HashAlgorithm::Sha512 => mac_matches::<Hmac<Sha512>>(&k.k, data, signature),
            HashAlgorithm::Sha1 => Err(JoseError::UnsupportedAlgorithm("HMAC SHA-1".into())),
        },
        _ => Err(mismatch(algorithm, key, "verify")),
    }
}
