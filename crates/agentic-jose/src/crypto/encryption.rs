//! Asymmetric key wrapping (RSA-OAEP) and AES-GCM content encryption.
//!
//! AES-GCM output is `ciphertext || tag` with a 128-bit tag; callers split
//! the tag off the end.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Nonce, Payload};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use rsa::Oaep;
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithms::{AlgorithmDescriptor, HashAlgorithm, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH};
use crate::crypto::keys::{rsa_private_key, rsa_public_key};
use crate::error::{JoseError, Result};
use crate::keys::{Jwk, RsaPrivateJwk};

type Aes192Gcm = AesGcm<Aes192, U12>;

fn oaep(hash: HashAlgorithm) -> Oaep {
    match hash {
        HashAlgorithm::Sha1 => Oaep::new::<sha1::Sha1>(),
        HashAlgorithm::Sha256 => Oaep::new::<Sha256>(),
        HashAlgorithm::Sha384 => Oaep::new::<Sha384>(),
        HashAlgorithm::Sha512 => Oaep::new::<Sha512>(),
    }
}

fn check_gcm_params(iv: &[u8], tag_length: usize) -> Result<()> {
    if tag_length != AES_GCM_TAG_LENGTH {
        return Err(JoseError::UnsupportedAlgorithm(format!(
            "AES-GCM with {tag_length}-bit tag"
        )));
    }
    if iv.len() != AES_GCM_IV_LENGTH {
        return Err(JoseError::InvalidArgument(format!(
            "AES-GCM initialization vector must be {AES_GCM_IV_LENGTH} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

fn seal<C: Aead + KeyInit>(key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|e| JoseError::InvalidKey(format!("AES-GCM key: {e}")))?;
    cipher
        .encrypt(
            Nonce::<C>::from_slice(iv),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| JoseError::CryptoFailure("AES-GCM encryption failed".into()))
}

fn open<C: Aead + KeyInit>(key: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|e| JoseError::InvalidKey(format!("AES-GCM key: {e}")))?;
    cipher
        .decrypt(
            Nonce::<C>::from_slice(iv),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| JoseError::CryptoFailure("AES-GCM authentication failed".into()))
}

fn mismatch(algorithm: &AlgorithmDescriptor, key: &Jwk, operation: &str) -> JoseError {
    JoseError::InvalidKey(format!(
        "{} cannot {operation} with a {} key",
        algorithm.name(),
        key.kty()
    ))
}

/// Encrypt under a public (RSA-OAEP) or symmetric (AES-GCM) key.
pub fn encrypt(algorithm: &AlgorithmDescriptor, key: &Jwk, plaintext: &[u8]) -> Result<Vec<u8>> {
    match (algorithm, key) {
        (AlgorithmDescriptor::RsaOaep { hash }, Jwk::RsaPublic(k))
        | (
            AlgorithmDescriptor::RsaOaep { hash },
            Jwk::RsaPrivate(RsaPrivateJwk { public: k, .. }),
        ) => rsa_public_key(k)?
            .encrypt(&mut rand::thread_rng(), oaep(*hash), plaintext)
            .map_err(|e| JoseError::CryptoFailure(format!("RSA-OAEP encrypt: {e}"))),
        (
            AlgorithmDescriptor::AesGcm {
                length,
                iv,
                additional_data,
                tag_length,
            },
            Jwk::Oct(k),
        ) => {
            check_gcm_params(iv, *tag_length)?;
            match length {
                128 => seal::<Aes128Gcm>(&k.k, iv, additional_data, plaintext),
                192 => seal::<Aes192Gcm>(&k.k, iv, additional_data, plaintext),
                256 => seal::<Aes256Gcm>(&k.k, iv, additional_data, plaintext),
                other => Err(JoseError::UnsupportedAlgorithm(format!("AES-GCM-{other}"))),
            }
        }
        _ => Err(mismatch(algorithm, key, "encrypt")),
    }
}

/// Decrypt with a private (RSA-OAEP) or symmetric (AES-GCM) key.
pub fn decrypt(algorithm: &AlgorithmDescriptor, key: &Jwk, ciphertext: &[u8]) -> Result<Vec<u8>> {
    match (algorithm, key) {
        (AlgorithmDescriptor::RsaOaep { hash }, Jwk::RsaPrivate(k)) => rsa_private_key(k)?
            .decrypt(oaep(*hash), ciphertext)
            .map_err(|e| JoseError::CryptoFailure(format!("RSA-OAEP decrypt: {e}"))),
        (
            AlgorithmDescriptor::AesGcm {
                length,
                iv,
                additional_data,
                tag_length,
            },
            Jwk::Oct(k),
        ) => {
            check_gcm_params(iv, *tag_length)?;
            match length {
                128 => open::<Aes128Gcm>(&k.k, iv, additional_data, ciphertext),
                192 => open::<Aes192Gcm>(&k.k, iv, additional_data, ciphertext),
                256 => open::<Aes256Gcm>(&k.k, iv, additional_data, ciphertext),
                other => Err(JoseError::UnsupportedAlgorithm(format!("AES-GCM-{other}"))),
            }
        }
        _ => Err(mismatch(algorithm, key, "decrypt")),
    }
}
