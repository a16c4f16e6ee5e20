//! Deterministic pairwise key derivation.
//!
//! A master seed plus a persona label and a peer label always yield the same
//! key pair, and distinct labels yield unrelated keys. The chain is:
//!
//! 1. persona master key = HMAC-SHA512(seed, persona)
//! 2. peer seed = HMAC-SHA512(persona master key, peer)
//! 3. secp256k1: scalar candidate `i` = HMAC-SHA256(peer seed, BE32(i)),
//!    `i` counting up from 0, first candidate in `[1, n)` wins
//! 4. RSA: prime `j` candidate `i` is the HMAC-SHA512 block stream over
//!    `[j] || BE32(i) || BE32(block)`, truncated to half the modulus, top two
//!    bits and low bit forced, first probable prime with `gcd(e, p - 1) = 1`
//!    wins
//!
//! Counters are part of the hashed input so re-derivation is exact.

use std::collections::HashMap;

use num_traits::{One, Zero};
use rsa::{BigUint, RsaPrivateKey};
use zeroize::Zeroizing;

use crate::algorithms::{HashAlgorithm, NamedCurve};
use crate::config::DEFAULT_RSA_MODULUS_LENGTH;
use crate::crypto::factory::CryptoFactory;
use crate::crypto::keys::{rsa_private_jwk, secp256k1_private_jwk, KeyGenParams, RSA_PUBLIC_EXPONENT};
use crate::crypto::signing::hmac;
use crate::error::{JoseError, Result};
use crate::keys::{Jwk, KeyReference};
use crate::store::KeyStoreOptions;

/// Miller-Rabin rounds applied to RSA prime candidates (a Lucas test follows).
const PRIME_TEST_ROUNDS: usize = 20;

/// Smallest RSA modulus the derivation accepts, in bits.
pub const MIN_PAIRWISE_RSA_BITS: usize = 512;

/// Derivation state bound to one master seed.
///
/// Caches persona master keys so deriving keys for many peers of the same
/// persona hashes the seed once. Cached values are wiped on drop.
pub struct PairwiseSession {
    seed: Zeroizing<Vec<u8>>,
    persona_keys: HashMap<String, Zeroizing<Vec<u8>>>,
}

impl PairwiseSession {
    pub fn new(seed: impl Into<Vec<u8>>) -> Self {
        Self {
            seed: Zeroizing::new(seed.into()),
            persona_keys: HashMap::new(),
        }
    }

    /// Open a session over the seed stored under `seed_reference`.
    ///
    /// The seed must be symmetric (`oct`) material.
    pub async fn open(factory: &CryptoFactory, seed_reference: &KeyReference) -> Result<Self> {
        let container = factory
            .key_store()
            .get(seed_reference, KeyStoreOptions::latest())
            .await?;
        match container.into_latest() {
            Jwk::Oct(secret) => Ok(Self::new(secret.k)),
            other => Err(JoseError::InvalidKey(format!(
                "pairwise seed {seed_reference} must be a symmetric key, found {}",
                other.kty()
            ))),
        }
    }

    /// The persona master key, computed once per persona.
    pub fn persona_master_key(&mut self, persona: &str) -> Result<&[u8]> {
        if !self.persona_keys.contains_key(persona) {
            let key = hmac(HashAlgorithm::Sha512, &self.seed, persona.as_bytes())?;
            self.persona_keys
                .insert(persona.to_string(), Zeroizing::new(key));
        }
        self.persona_keys
            .get(persona)
            .map(|key| key.as_slice())
            .ok_or_else(|| JoseError::CryptoFailure("persona key cache miss".into()))
    }

    /// Derive the private key for `(persona, peer)`.
    ///
    /// `params` are validated before any hashing happens.
    pub fn derive(&mut self, params: &KeyGenParams, persona: &str, peer: &str) -> Result<Jwk> {
        let target = PairwiseTarget::from_params(params)?;
        let master = self.persona_master_key(persona)?.to_vec();
        let master = Zeroizing::new(master);
        let peer_seed = Zeroizing::new(hmac(HashAlgorithm::Sha512, &master, peer.as_bytes())?);

        match target {
            PairwiseTarget::Secp256k1 => {
                let secret = derive_secp256k1(&peer_seed)?;
                Ok(Jwk::EcPrivate(secp256k1_private_jwk(&secret)).with_alg("ES256K"))
            }
            PairwiseTarget::Rsa {
                algorithm,
                modulus_length,
            } => {
                let key = derive_rsa(&peer_seed, modulus_length)?;
                Ok(Jwk::RsaPrivate(rsa_private_jwk(&key)?).with_alg(algorithm))
            }
        }
    }
}

enum PairwiseTarget {
    Secp256k1,
    Rsa {
        algorithm: String,
        modulus_length: usize,
    },
}

impl PairwiseTarget {
    fn from_params(params: &KeyGenParams) -> Result<Self> {
        match params {
            KeyGenParams::Ecdsa { named_curve } => match NamedCurve::from_name(named_curve)? {
                NamedCurve::Secp256k1 => Ok(PairwiseTarget::Secp256k1),
                NamedCurve::Ed25519 => Err(JoseError::UnsupportedCurve(named_curve.clone())),
            },
            KeyGenParams::Rsa {
                algorithm,
                modulus_length,
            } => {
                let modulus_length = modulus_length.unwrap_or(DEFAULT_RSA_MODULUS_LENGTH);
                if modulus_length < MIN_PAIRWISE_RSA_BITS || modulus_length % 16 != 0 {
                    return Err(JoseError::InvalidArgument(format!(
                        "pairwise RSA modulus must be a multiple of 16 bits and at least {MIN_PAIRWISE_RSA_BITS}, got {modulus_length}"
                    )));
                }
                Ok(PairwiseTarget::Rsa {
                    algorithm: algorithm.clone(),
                    modulus_length,
                })
            }
            other => Err(JoseError::UnsupportedPairwiseKeyType(other.name().to_string())),
        }
    }
}

fn derive_secp256k1(peer_seed: &[u8]) -> Result<k256::SecretKey> {
    for counter in 0..=u32::MAX {
        let candidate = Zeroizing::new(hmac(
            HashAlgorithm::Sha256,
            peer_seed,
            &counter.to_be_bytes(),
        )?);
        // Rejects zero and anything at or above the group order.
        match k256::SecretKey::from_slice(&candidate) {
            Ok(secret) => {
                if counter > 0 {
                    log::debug!("secp256k1 scalar accepted after {counter} rejected candidates");
                }
                return Ok(secret);
            }
            Err(_) => continue,
        }
    }
    Err(JoseError::CryptoFailure(
        "secp256k1 scalar search exhausted".into(),
    ))
}

fn derive_rsa(peer_seed: &[u8], modulus_length: usize) -> Result<RsaPrivateKey> {
    let e = BigUint::from(RSA_PUBLIC_EXPONENT);
    let prime_bytes = modulus_length / 16;
    let p = derive_prime(peer_seed, 0, prime_bytes, &e, None)?;
    let q = derive_prime(peer_seed, 1, prime_bytes, &e, Some(&p))?;
    RsaPrivateKey::from_p_q(p, q, e)
        .map_err(|err| JoseError::CryptoFailure(format!("RSA assembly from derived primes: {err}")))
}

fn derive_prime(
    peer_seed: &[u8],
    index: u8,
    len: usize,
    e: &BigUint,
    other: Option<&BigUint>,
) -> Result<BigUint> {
    for counter in 0..=u32::MAX {
        let mut bytes = Zeroizing::new(Vec::with_capacity(len + 64));
        let mut block = 0u32;
        while bytes.len() < len {
            let mut msg = Vec::with_capacity(9);
            msg.push(index);
            msg.extend_from_slice(&counter.to_be_bytes());
            msg.extend_from_slice(&block.to_be_bytes());
            bytes.extend(hmac(HashAlgorithm::Sha512, peer_seed, &msg)?);
            block += 1;
        }
        bytes.truncate(len);
        // Two top bits make p * q exactly twice as long as each prime.
        bytes[0] |= 0xC0;
        bytes[len - 1] |= 0x01;

        let candidate = BigUint::from_bytes_be(&bytes);
        if other == Some(&candidate) {
            continue;
        }
        if !num_bigint_dig::prime::probably_prime(&candidate, PRIME_TEST_ROUNDS) {
            continue;
        }
        // e is prime, so gcd(e, p - 1) = 1 unless e divides p - 1.
        if ((&candidate - BigUint::one()) % e).is_zero() {
            log::warn!("Derived prime candidate {index} rejected: e divides p - 1");
            continue;
        }
        log::debug!("RSA prime {index} found at counter {counter}");
        return Ok(candidate);
    }
    Err(JoseError::CryptoFailure("RSA prime search exhausted".into()))
}

/// Derive a pairwise key from the seed stored under `seed_reference`.
///
/// An unset RSA modulus length takes the factory's configured default.
pub async fn generate_pairwise_key(
    factory: &CryptoFactory,
    params: &KeyGenParams,
    seed_reference: &KeyReference,
    persona: &str,
    peer: &str,
) -> Result<Jwk> {
    let params = params.with_defaults(factory.config());
    PairwiseTarget::from_params(&params)?;
    let mut session = PairwiseSession::open(factory, seed_reference).await?;
    session.derive(&params, persona, peer)
}
