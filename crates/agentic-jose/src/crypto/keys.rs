//! Key generation and conversion between JWKs and primitive key types.
//!
//! secp256k1 keys are handled with `k256`, Ed25519 with `ed25519-dalek`
//! and RSA with `rsa`. Every conversion validates the JWK members before
//! handing them to the primitive library.

use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use k256::ecdsa::{SigningKey as EcSigningKey, VerifyingKey as EcVerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::algorithms::NamedCurve;
use crate::config::{JoseConfig, DEFAULT_RSA_MODULUS_LENGTH};
use crate::crypto::random::random_bytes_vec;
use crate::error::{JoseError, Result};
use crate::keys::{
    EcPrivateJwk, EcPublicJwk, Jwk, KeyMetadata, OkpPrivateJwk, OkpPublicJwk, RsaPrivateJwk,
    RsaPublicJwk,
};

/// The fixed RSA public exponent.
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Parameters for generating (or deriving) a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGenParams {
    /// ECDSA key on a named curve; `alg` becomes the key's declared algorithm.
    Ecdsa { named_curve: String },
    /// Ed25519 key for EdDSA.
    EdDsa,
    /// RSA key for signing (`RS*`) or key encryption (`RSA-OAEP*`).
    /// A `None` modulus length takes the configured default.
    Rsa {
        algorithm: String,
        modulus_length: Option<usize>,
    },
    /// Symmetric secret for `A*GCM` or `HS*`.
    Secret { algorithm: String },
}

impl KeyGenParams {
    /// Structured family name of the requested key.
    pub fn name(&self) -> &str {
        match self {
            KeyGenParams::Ecdsa { .. } => "ECDSA",
            KeyGenParams::EdDsa => "EdDSA",
            KeyGenParams::Rsa { algorithm, .. } if algorithm.starts_with("RSA-OAEP") => "RSA-OAEP",
            KeyGenParams::Rsa { .. } => "RSASSA-PKCS1-v1_5",
            KeyGenParams::Secret { algorithm } if algorithm.starts_with("HS") => "HMAC",
            KeyGenParams::Secret { .. } => "AES-GCM",
        }
    }

    /// Fill unset sizes from `config`.
    pub fn with_defaults(&self, config: &JoseConfig) -> KeyGenParams {
        match self {
            KeyGenParams::Rsa {
                algorithm,
                modulus_length: None,
            } => KeyGenParams::Rsa {
                algorithm: algorithm.clone(),
                modulus_length: Some(config.default_rsa_modulus_length),
            },
            other => other.clone(),
        }
    }

    /// The intended `use` of the generated key: `sig` or `enc`.
    pub fn key_use(&self) -> &'static str {
        match self.name() {
            "RSA-OAEP" | "AES-GCM" => "enc",
            _ => "sig",
        }
    }
}

/// Generate a fresh random key.
pub fn generate(params: &KeyGenParams) -> Result<Jwk> {
    match params {
        KeyGenParams::Ecdsa { named_curve } => match NamedCurve::from_name(named_curve)? {
            NamedCurve::Secp256k1 => {
                let secret = k256::SecretKey::random(&mut rand::thread_rng());
                Ok(Jwk::EcPrivate(secp256k1_private_jwk(&secret)).with_alg("ES256K"))
            }
            NamedCurve::Ed25519 => Err(JoseError::UnsupportedCurve(named_curve.clone())),
        },
        KeyGenParams::EdDsa => {
            let signing_key = Ed25519SigningKey::generate(&mut rand::thread_rng());
            Ok(Jwk::OkpPrivate(ed25519_private_jwk(&signing_key)).with_alg("EdDSA"))
        }
        KeyGenParams::Rsa {
            algorithm,
            modulus_length,
        } => {
            let bits = modulus_length.unwrap_or(DEFAULT_RSA_MODULUS_LENGTH);
            let key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
                .map_err(|e| JoseError::CryptoFailure(format!("RSA key generation: {e}")))?;
            Ok(Jwk::RsaPrivate(rsa_private_jwk(&key)?).with_alg(algorithm.clone()))
        }
        KeyGenParams::Secret { algorithm } => {
            let len = secret_length(algorithm)?;
            Ok(Jwk::oct(random_bytes_vec(len)).with_alg(algorithm.clone()))
        }
    }
}

fn secret_length(algorithm: &str) -> Result<usize> {
    match algorithm {
        "A128GCM" => Ok(16),
        "A192GCM" => Ok(24),
        "A256GCM" | "HS256" => Ok(32),
        "HS384" => Ok(48),
        "HS512" => Ok(64),
        other => Err(JoseError::UnsupportedAlgorithm(other.to_string())),
    }
}

// ── secp256k1 ────────────────────────────────────────────────────────────────

/// Build a private JWK from a secp256k1 scalar.
pub fn secp256k1_private_jwk(secret: &k256::SecretKey) -> EcPrivateJwk {
    let point = secret.public_key().to_encoded_point(false);
    EcPrivateJwk {
        public: EcPublicJwk {
            meta: KeyMetadata::default(),
            crv: NamedCurve::Secp256k1.jwk_name().to_string(),
            x: point.x().map(|x| x.to_vec()).unwrap_or_default(),
            y: point.y().map(|y| y.to_vec()).unwrap_or_default(),
        },
        d: secret.to_bytes().to_vec(),
    }
}

pub fn secp256k1_signing_key(jwk: &EcPrivateJwk) -> Result<EcSigningKey> {
    if NamedCurve::from_name(&jwk.public.crv)? != NamedCurve::Secp256k1 {
        return Err(JoseError::UnsupportedCurve(jwk.public.crv.clone()));
    }
    EcSigningKey::from_slice(&jwk.d)
        .map_err(|e| JoseError::InvalidKey(format!("invalid secp256k1 private key: {e}")))
}

pub fn secp256k1_verifying_key(jwk: &EcPublicJwk) -> Result<EcVerifyingKey> {
    if NamedCurve::from_name(&jwk.crv)? != NamedCurve::Secp256k1 {
        return Err(JoseError::UnsupportedCurve(jwk.crv.clone()));
    }
    if jwk.x.len() != 32 || jwk.y.len() != 32 {
        return Err(JoseError::InvalidKey(
            "secp256k1 coordinates must be 32 bytes".into(),
        ));
    }
    let point = k256::EncodedPoint::from_affine_coordinates(
        k256::FieldBytes::from_slice(&jwk.x),
        k256::FieldBytes::from_slice(&jwk.y),
        false,
    );
    EcVerifyingKey::from_encoded_point(&point)
        .map_err(|e| JoseError::InvalidKey(format!("invalid secp256k1 public key: {e}")))
}

// ── Ed25519 ──────────────────────────────────────────────────────────────────

pub fn ed25519_private_jwk(signing_key: &Ed25519SigningKey) -> OkpPrivateJwk {
    OkpPrivateJwk {
        public: OkpPublicJwk {
            meta: KeyMetadata::default(),
            crv: NamedCurve::Ed25519.jwk_name().to_string(),
            x: signing_key.verifying_key().to_bytes().to_vec(),
        },
        d: signing_key.to_bytes().to_vec(),
    }
}

pub fn ed25519_signing_key(jwk: &OkpPrivateJwk) -> Result<Ed25519SigningKey> {
    if NamedCurve::from_name(&jwk.public.crv)? != NamedCurve::Ed25519 {
        return Err(JoseError::UnsupportedCurve(jwk.public.crv.clone()));
    }
    let bytes: [u8; 32] = jwk
        .d
        .as_slice()
        .try_into()
        .map_err(|_| JoseError::InvalidKey("Ed25519 private key must be 32 bytes".into()))?;
    Ok(Ed25519SigningKey::from_bytes(&bytes))
}

pub fn ed25519_verifying_key(jwk: &OkpPublicJwk) -> Result<Ed25519VerifyingKey> {
    if NamedCurve::from_name(&jwk.crv)? != NamedCurve::Ed25519 {
        return Err(JoseError::UnsupportedCurve(jwk.crv.clone()));
    }
    let bytes: [u8; 32] = jwk
        .x
        .as_slice()
        .try_into()
        .map_err(|_| JoseError::InvalidKey("Ed25519 public key must be 32 bytes".into()))?;
    Ed25519VerifyingKey::from_bytes(&bytes)
        .map_err(|e| JoseError::InvalidKey(format!("invalid Ed25519 public key: {e}")))
}

// ── RSA ──────────────────────────────────────────────────────────────────────

/// Export an RSA private key with its CRT parameters.
pub fn rsa_private_jwk(key: &RsaPrivateKey) -> Result<RsaPrivateJwk> {
    let primes = key.primes();
    if primes.len() != 2 {
        return Err(JoseError::InvalidKey(
            "multi-prime RSA keys are not supported".into(),
        ));
    }
    let missing = || JoseError::InvalidKey("RSA key lacks CRT parameters".into());
    Ok(RsaPrivateJwk {
        public: RsaPublicJwk {
            meta: KeyMetadata::default(),
            n: key.n().to_bytes_be(),
            e: key.e().to_bytes_be(),
        },
        d: key.d().to_bytes_be(),
        p: primes[0].to_bytes_be(),
        q: primes[1].to_bytes_be(),
        dp: key.dp().ok_or_else(missing)?.to_bytes_be(),
        dq: key.dq().ok_or_else(missing)?.to_bytes_be(),
        qi: key.crt_coefficient().ok_or_else(missing)?.to_bytes_be(),
    })
}

pub fn rsa_private_key(jwk: &RsaPrivateJwk) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_components(
        BigUint::from_bytes_be(&jwk.public.n),
        BigUint::from_bytes_be(&jwk.public.e),
        BigUint::from_bytes_be(&jwk.d),
        vec![
            BigUint::from_bytes_be(&jwk.p),
            BigUint::from_bytes_be(&jwk.q),
        ],
    )
    .map_err(|e| JoseError::InvalidKey(format!("invalid RSA private key: {e}")))
}

pub fn rsa_public_key(jwk: &RsaPublicJwk) -> Result<RsaPublicKey> {
    RsaPublicKey::new(
        BigUint::from_bytes_be(&jwk.n),
        BigUint::from_bytes_be(&jwk.e),
    )
    .map_err(|e| JoseError::InvalidKey(format!("invalid RSA public key: {e}")))
}
