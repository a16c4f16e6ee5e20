//! Algorithm naming bridge.
//!
//! Token headers name algorithms with compact JOSE identifiers (`ES256K`,
//! `RSA-OAEP-256`, `A256GCM`). Primitive adapters work with structured
//! [`AlgorithmDescriptor`]s. This module maps between the two and derives the
//! descriptor used to import a given key. The mapping is pure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{JoseError, Result};
use crate::keys::{Jwk, KeyType};

/// AES-GCM authentication tag length in bits.
pub const AES_GCM_TAG_LENGTH: usize = 128;

/// AES-GCM initialization vector length in bytes.
pub const AES_GCM_IV_LENGTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "1",
            HashAlgorithm::Sha256 => "256",
            HashAlgorithm::Sha384 => "384",
            HashAlgorithm::Sha512 => "512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedCurve {
    #[serde(rename = "secp256k1")]
    Secp256k1,
    #[serde(rename = "Ed25519")]
    Ed25519,
}

impl NamedCurve {
    /// Parse a JWK `crv` value. Unknown curves fail with `UnsupportedCurve`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "secp256k1" | "K-256" | "P-256K" => Ok(NamedCurve::Secp256k1),
            "Ed25519" | "ed25519" => Ok(NamedCurve::Ed25519),
            other => Err(JoseError::UnsupportedCurve(other.to_string())),
        }
    }

    /// The registered JWK `crv` value.
    pub fn jwk_name(&self) -> &'static str {
        match self {
            NamedCurve::Secp256k1 => "secp256k1",
            NamedCurve::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jwk_name())
    }
}

/// Structured algorithm parameters consumed by primitive adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmDescriptor {
    Ecdsa {
        curve: NamedCurve,
        hash: HashAlgorithm,
    },
    EdDsa {
        curve: NamedCurve,
    },
    RsassaPkcs1V15 {
        hash: HashAlgorithm,
    },
    RsaOaep {
        hash: HashAlgorithm,
    },
    AesGcm {
        /// Key length in bits.
        length: usize,
        iv: Vec<u8>,
        additional_data: Vec<u8>,
        /// Tag length in bits.
        tag_length: usize,
    },
    Hmac {
        hash: HashAlgorithm,
    },
    Digest {
        hash: HashAlgorithm,
    },
}

impl AlgorithmDescriptor {
    /// The structured family name, e.g. `ECDSA` or `AES-GCM`.
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmDescriptor::Ecdsa { .. } => "ECDSA",
            AlgorithmDescriptor::EdDsa { .. } => "EdDSA",
            AlgorithmDescriptor::RsassaPkcs1V15 { .. } => "RSASSA-PKCS1-v1_5",
            AlgorithmDescriptor::RsaOaep { .. } => "RSA-OAEP",
            AlgorithmDescriptor::AesGcm { .. } => "AES-GCM",
            AlgorithmDescriptor::Hmac { .. } => "HMAC",
            AlgorithmDescriptor::Digest { hash } => hash.name(),
        }
    }
}

/// Extra inputs some descriptors need.
#[derive(Debug, Clone, Default)]
pub struct DescriptorContext {
    pub iv: Option<Vec<u8>>,
    pub additional_data: Option<Vec<u8>>,
}

impl DescriptorContext {
    pub fn aes_gcm(iv: impl Into<Vec<u8>>, additional_data: impl Into<Vec<u8>>) -> Self {
        Self {
            iv: Some(iv.into()),
            additional_data: Some(additional_data.into()),
        }
    }
}

/// Map a compact JOSE identifier to a descriptor.
pub fn to_descriptor(compact_id: &str, context: &DescriptorContext) -> Result<AlgorithmDescriptor> {
    let descriptor = match compact_id {
        "ES256K" => AlgorithmDescriptor::Ecdsa {
            curve: NamedCurve::Secp256k1,
            hash: HashAlgorithm::Sha256,
        },
        "EdDSA" => AlgorithmDescriptor::EdDsa {
            curve: NamedCurve::Ed25519,
        },
        "RS256" => AlgorithmDescriptor::RsassaPkcs1V15 {
            hash: HashAlgorithm::Sha256,
        },
        "RS384" => AlgorithmDescriptor::RsassaPkcs1V15 {
            hash: HashAlgorithm::Sha384,
        },
        "RS512" => AlgorithmDescriptor::RsassaPkcs1V15 {
            hash: HashAlgorithm::Sha512,
        },
        "RSA-OAEP" => AlgorithmDescriptor::RsaOaep {
            hash: HashAlgorithm::Sha1,
        },
        "RSA-OAEP-256" => AlgorithmDescriptor::RsaOaep {
            hash: HashAlgorithm::Sha256,
        },
        "A128GCM" | "A192GCM" | "A256GCM" => {
            let length = compact_id[1..4]
                .parse()
                .map_err(|_| JoseError::UnsupportedAlgorithm(compact_id.to_string()))?;
            let iv = context.iv.clone().ok_or_else(|| {
                JoseError::InvalidArgument(format!("{compact_id} requires an initialization vector"))
            })?;
            let additional_data = context.additional_data.clone().ok_or_else(|| {
                JoseError::InvalidArgument(format!(
                    "{compact_id} requires additional authenticated data"
                ))
            })?;
            AlgorithmDescriptor::AesGcm {
                length,
                iv,
                additional_data,
                tag_length: AES_GCM_TAG_LENGTH,
            }
        }
        "HS256" => AlgorithmDescriptor::Hmac {
            hash: HashAlgorithm::Sha256,
        },
        "HS384" => AlgorithmDescriptor::Hmac {
            hash: HashAlgorithm::Sha384,
        },
        "HS512" => AlgorithmDescriptor::Hmac {
            hash: HashAlgorithm::Sha512,
        },
        "SHA-256" => AlgorithmDescriptor::Digest {
            hash: HashAlgorithm::Sha256,
        },
        "SHA-384" => AlgorithmDescriptor::Digest {
            hash: HashAlgorithm::Sha384,
        },
        "SHA-512" => AlgorithmDescriptor::Digest {
            hash: HashAlgorithm::Sha512,
        },
        other => return Err(JoseError::UnsupportedAlgorithm(other.to_string())),
    };
    Ok(descriptor)
}

/// Map a descriptor back to its compact JOSE identifier.
pub fn to_compact_id(descriptor: &AlgorithmDescriptor) -> Result<String> {
    let unsupported = || JoseError::UnsupportedAlgorithm(format!("{descriptor:?}"));
    let id = match descriptor {
        AlgorithmDescriptor::Ecdsa {
            curve: NamedCurve::Secp256k1,
            hash: HashAlgorithm::Sha256,
        } => "ES256K".to_string(),
        AlgorithmDescriptor::EdDsa {
            curve: NamedCurve::Ed25519,
        } => "EdDSA".to_string(),
        AlgorithmDescriptor::RsassaPkcs1V15 { hash } if *hash != HashAlgorithm::Sha1 => {
            format!("RS{}", hash.suffix())
        }
        AlgorithmDescriptor::RsaOaep {
            hash: HashAlgorithm::Sha1,
        } => "RSA-OAEP".to_string(),
        AlgorithmDescriptor::RsaOaep {
            hash: HashAlgorithm::Sha256,
        } => "RSA-OAEP-256".to_string(),
        AlgorithmDescriptor::AesGcm { length, .. } if matches!(*length, 128 | 192 | 256) => {
            format!("A{length}GCM")
        }
        AlgorithmDescriptor::Hmac { hash } if *hash != HashAlgorithm::Sha1 => {
            format!("HS{}", hash.suffix())
        }
        AlgorithmDescriptor::Digest { hash } if *hash != HashAlgorithm::Sha1 => {
            hash.name().to_string()
        }
        _ => return Err(unsupported()),
    };
    Ok(id)
}

/// Parameters for importing a key to use with a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    /// Structured family name the key is bound to.
    pub name: &'static str,
    pub key_type: KeyType,
    pub curve: Option<NamedCurve>,
    pub hash: Option<HashAlgorithm>,
}

/// Work out how `key` must be imported to serve `descriptor`.
///
/// Fails with `InvalidKey` when the key family does not fit the algorithm.
pub fn resolve_key_import_descriptor(
    descriptor: &AlgorithmDescriptor,
    key: &Jwk,
) -> Result<ImportDescriptor> {
    let expect = |kty: KeyType| -> Result<()> {
        if key.kty() == kty {
            Ok(())
        } else {
            Err(JoseError::InvalidKey(format!(
                "{} requires a {kty} key, got {}",
                descriptor.name(),
                key.kty()
            )))
        }
    };
    let curve_matches = |expected: NamedCurve| -> Result<NamedCurve> {
        let crv = key
            .curve()
            .ok_or_else(|| JoseError::InvalidKey("key has no curve".into()))?;
        // A curve this crate cannot parse is still just the wrong key here.
        let curve = NamedCurve::from_name(crv).map_err(|_| {
            JoseError::InvalidKey(format!(
                "{} over {expected} cannot use a {crv} key",
                descriptor.name()
            ))
        })?;
        if curve != expected {
            return Err(JoseError::InvalidKey(format!(
                "{} over {expected} cannot use a {curve} key",
                descriptor.name()
            )));
        }
        Ok(curve)
    };

    let import = match descriptor {
        AlgorithmDescriptor::Ecdsa { curve, hash } => {
            expect(KeyType::Ec)?;
            ImportDescriptor {
                name: descriptor.name(),
                key_type: KeyType::Ec,
                curve: Some(curve_matches(*curve)?),
                hash: Some(*hash),
            }
        }
        AlgorithmDescriptor::EdDsa { curve } => {
            expect(KeyType::Okp)?;
            ImportDescriptor {
                name: descriptor.name(),
                key_type: KeyType::Okp,
                curve: Some(curve_matches(*curve)?),
                hash: None,
            }
        }
        AlgorithmDescriptor::RsassaPkcs1V15 { hash } | AlgorithmDescriptor::RsaOaep { hash } => {
            expect(KeyType::Rsa)?;
            ImportDescriptor {
                name: descriptor.name(),
                key_type: KeyType::Rsa,
                curve: None,
                hash: Some(*hash),
            }
        }
        AlgorithmDescriptor::AesGcm { length, .. } => {
            expect(KeyType::Oct)?;
            if let Jwk::Oct(k) = key {
                if k.k.len() * 8 != *length {
                    return Err(JoseError::InvalidKey(format!(
                        "AES-GCM-{length} needs a {}-byte key, got {}",
                        length / 8,
                        k.k.len()
                    )));
                }
            }
            ImportDescriptor {
                name: descriptor.name(),
                key_type: KeyType::Oct,
                curve: None,
                hash: None,
            }
        }
        AlgorithmDescriptor::Hmac { hash } => {
            expect(KeyType::Oct)?;
            ImportDescriptor {
                name: descriptor.name(),
                key_type: KeyType::Oct,
                curve: None,
                hash: Some(*hash),
            }
        }
        AlgorithmDescriptor::Digest { .. } => {
            return Err(JoseError::InvalidArgument(
                "digest algorithms take no key".into(),
            ))
        }
    };
    Ok(import)
}

/// One row of the supported-algorithm table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmFamily {
    pub family: &'static str,
    pub compact_ids: &'static [&'static str],
}

const SUPPORTED: &[AlgorithmFamily] = &[
    AlgorithmFamily {
        family: "RSASSA-PKCS1-v1_5",
        compact_ids: &["RS256", "RS384", "RS512"],
    },
    AlgorithmFamily {
        family: "RSA-OAEP",
        compact_ids: &["RSA-OAEP", "RSA-OAEP-256"],
    },
    AlgorithmFamily {
        family: "AES-GCM",
        compact_ids: &["A128GCM", "A192GCM", "A256GCM"],
    },
    AlgorithmFamily {
        family: "ECDSA",
        compact_ids: &["ES256K"],
    },
    AlgorithmFamily {
        family: "EdDSA",
        compact_ids: &["EdDSA"],
    },
    AlgorithmFamily {
        family: "HMAC",
        compact_ids: &["HS256", "HS384", "HS512"],
    },
    AlgorithmFamily {
        family: "SHA",
        compact_ids: &["SHA-256", "SHA-384", "SHA-512"],
    },
];

/// The algorithm families this engine understands.
pub fn supported_algorithms() -> &'static [AlgorithmFamily] {
    SUPPORTED
}
