//! JSON Web Key material.
//!
//! [`Jwk`] is a closed sum type over the key families the engine handles.
//! Algorithm-specific members only exist on the matching variant; the flat
//! RFC 7517 JSON form is produced and consumed through [`RawJwk`].

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{JoseError, Result};

/// The `kty` family of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "OKP")]
    Okp,
    #[serde(rename = "oct")]
    Oct,
}

impl KeyType {
    /// The registered `kty` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ec => "EC",
            KeyType::Rsa => "RSA",
            KeyType::Okp => "OKP",
            KeyType::Oct => "oct",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Members shared by every key family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Key identifier (`kid`).
    pub kid: Option<String>,
    /// Declared algorithm (`alg`), e.g. `ES256K` or `RSA-OAEP-256`.
    pub alg: Option<String>,
    /// Intended use (`use`): `sig` or `enc`.
    pub key_use: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicJwk {
    pub meta: KeyMetadata,
    pub crv: String,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct EcPrivateJwk {
    pub public: EcPublicJwk,
    pub d: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicJwk {
    pub meta: KeyMetadata,
    pub n: Vec<u8>,
    pub e: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateJwk {
    pub public: RsaPublicJwk,
    pub d: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub dp: Vec<u8>,
    pub dq: Vec<u8>,
    pub qi: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkpPublicJwk {
    pub meta: KeyMetadata,
    pub crv: String,
    pub x: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct OkpPrivateJwk {
    pub public: OkpPublicJwk,
    pub d: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct OctJwk {
    pub meta: KeyMetadata,
    pub k: Vec<u8>,
}

// Private members are never printed.
impl fmt::Debug for EcPrivateJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateJwk")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RsaPrivateJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateJwk")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for OkpPrivateJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkpPrivateJwk")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for OctJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OctJwk")
            .field("meta", &self.meta)
            .field("len", &self.k.len())
            .finish_non_exhaustive()
    }
}

/// A cryptographic key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawJwk", into = "RawJwk")]
pub enum Jwk {
    EcPublic(EcPublicJwk),
    EcPrivate(EcPrivateJwk),
    RsaPublic(RsaPublicJwk),
    RsaPrivate(RsaPrivateJwk),
    OkpPublic(OkpPublicJwk),
    OkpPrivate(OkpPrivateJwk),
    Oct(OctJwk),
}

impl Jwk {
    /// Wrap raw bytes as a symmetric key.
    pub fn oct(k: impl Into<Vec<u8>>) -> Self {
        Jwk::Oct(OctJwk {
            meta: KeyMetadata::default(),
            k: k.into(),
        })
    }

    pub fn kty(&self) -> KeyType {
        match self {
            Jwk::EcPublic(_) | Jwk::EcPrivate(_) => KeyType::Ec,
            Jwk::RsaPublic(_) | Jwk::RsaPrivate(_) => KeyType::Rsa,
            Jwk::OkpPublic(_) | Jwk::OkpPrivate(_) => KeyType::Okp,
            Jwk::Oct(_) => KeyType::Oct,
        }
    }

    pub fn metadata(&self) -> &KeyMetadata {
        match self {
            Jwk::EcPublic(k) => &k.meta,
            Jwk::EcPrivate(k) => &k.public.meta,
            Jwk::RsaPublic(k) => &k.meta,
            Jwk::RsaPrivate(k) => &k.public.meta,
            Jwk::OkpPublic(k) => &k.meta,
            Jwk::OkpPrivate(k) => &k.public.meta,
            Jwk::Oct(k) => &k.meta,
        }
    }

    fn metadata_mut(&mut self) -> &mut KeyMetadata {
        match self {
            Jwk::EcPublic(k) => &mut k.meta,
            Jwk::EcPrivate(k) => &mut k.public.meta,
            Jwk::RsaPublic(k) => &mut k.meta,
            Jwk::RsaPrivate(k) => &mut k.public.meta,
            Jwk::OkpPublic(k) => &mut k.meta,
            Jwk::OkpPrivate(k) => &mut k.public.meta,
            Jwk::Oct(k) => &mut k.meta,
        }
    }

    pub fn kid(&self) -> Option<&str> {
        self.metadata().kid.as_deref()
    }

    pub fn alg(&self) -> Option<&str> {
        self.metadata().alg.as_deref()
    }

    pub fn key_use(&self) -> Option<&str> {
        self.metadata().key_use.as_deref()
    }

    /// Return the key with its `kid` replaced.
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.metadata_mut().kid = Some(kid.into());
        self
    }

    /// Return the key with its declared algorithm replaced.
    pub fn with_alg(mut self, alg: impl Into<String>) -> Self {
        self.metadata_mut().alg = Some(alg.into());
        self
    }

    /// Return the key with its `use` member replaced.
    pub fn with_use(mut self, key_use: impl Into<String>) -> Self {
        self.metadata_mut().key_use = Some(key_use.into());
        self
    }

    /// True for private and symmetric material.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Jwk::EcPrivate(_) | Jwk::RsaPrivate(_) | Jwk::OkpPrivate(_) | Jwk::Oct(_)
        )
    }

    /// The curve name for EC and OKP keys.
    pub fn curve(&self) -> Option<&str> {
        match self {
            Jwk::EcPublic(k) => Some(&k.crv),
            Jwk::EcPrivate(k) => Some(&k.public.crv),
            Jwk::OkpPublic(k) => Some(&k.crv),
            Jwk::OkpPrivate(k) => Some(&k.public.crv),
            _ => None,
        }
    }

    /// Strip private members. Symmetric keys have no public form.
    pub fn to_public(&self) -> Result<Jwk> {
        match self {
            Jwk::EcPublic(_) | Jwk::RsaPublic(_) | Jwk::OkpPublic(_) => Ok(self.clone()),
            Jwk::EcPrivate(k) => Ok(Jwk::EcPublic(k.public.clone())),
            Jwk::RsaPrivate(k) => Ok(Jwk::RsaPublic(k.public.clone())),
            Jwk::OkpPrivate(k) => Ok(Jwk::OkpPublic(k.public.clone())),
            Jwk::Oct(_) => Err(JoseError::InvalidKey(
                "a symmetric key has no public form".into(),
            )),
        }
    }

    /// RFC 7638 SHA-256 thumbprint of the required public members.
    pub fn thumbprint(&self) -> Result<String> {
        let quote = |s: &str| serde_json::to_string(s).unwrap_or_default();
        let canonical = match self.to_public_or_oct() {
            Jwk::EcPublic(k) => format!(
                r#"{{"crv":{},"kty":"EC","x":"{}","y":"{}"}}"#,
                quote(&k.crv),
                b64url_encode(&k.x),
                b64url_encode(&k.y)
            ),
            Jwk::RsaPublic(k) => format!(
                r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
                b64url_encode(&k.e),
                b64url_encode(&k.n)
            ),
            Jwk::OkpPublic(k) => format!(
                r#"{{"crv":{},"kty":"OKP","x":"{}"}}"#,
                quote(&k.crv),
                b64url_encode(&k.x)
            ),
            Jwk::Oct(k) => format!(r#"{{"k":"{}","kty":"oct"}}"#, b64url_encode(&k.k)),
            _ => return Err(JoseError::InvalidKey("cannot thumbprint key".into())),
        };
        Ok(b64url_encode(Sha256::digest(canonical.as_bytes())))
    }

    fn to_public_or_oct(&self) -> Jwk {
        self.to_public().unwrap_or_else(|_| self.clone())
    }
}

/// Flat RFC 7517 representation used on the wire and on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RawJwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

fn required(value: &Option<String>, member: &str, kty: &str) -> Result<Vec<u8>> {
    let encoded = value
        .as_deref()
        .ok_or_else(|| JoseError::InvalidKey(format!("{kty} key is missing '{member}'")))?;
    b64url_decode(encoded, member)
}

fn optional(value: &Option<String>, member: &str) -> Result<Option<Vec<u8>>> {
    value
        .as_deref()
        .map(|encoded| b64url_decode(encoded, member))
        .transpose()
}

fn curve_of(raw: &RawJwk) -> Result<String> {
    raw.crv
        .clone()
        .ok_or_else(|| JoseError::InvalidKey(format!("{} key is missing 'crv'", raw.kty)))
}

impl TryFrom<RawJwk> for Jwk {
    type Error = JoseError;

    fn try_from(raw: RawJwk) -> Result<Self> {
        let meta = KeyMetadata {
            kid: raw.kid.clone(),
            alg: raw.alg.clone(),
            key_use: raw.key_use.clone(),
        };
        let kty = raw.kty.as_str();
        match kty {
            "EC" => {
                let public = EcPublicJwk {
                    meta,
                    crv: curve_of(&raw)?,
                    x: required(&raw.x, "x", kty)?,
                    y: required(&raw.y, "y", kty)?,
                };
                Ok(match optional(&raw.d, "d")? {
                    Some(d) => Jwk::EcPrivate(EcPrivateJwk { public, d }),
                    None => Jwk::EcPublic(public),
                })
            }
            "RSA" => {
                let public = RsaPublicJwk {
                    meta,
                    n: required(&raw.n, "n", kty)?,
                    e: required(&raw.e, "e", kty)?,
                };
                Ok(match optional(&raw.d, "d")? {
                    Some(d) => Jwk::RsaPrivate(RsaPrivateJwk {
                        public,
                        d,
                        p: required(&raw.p, "p", kty)?,
                        q: required(&raw.q, "q", kty)?,
                        dp: required(&raw.dp, "dp", kty)?,
                        dq: required(&raw.dq, "dq", kty)?,
                        qi: required(&raw.qi, "qi", kty)?,
                    }),
                    None => Jwk::RsaPublic(public),
                })
            }
            "OKP" => {
                let public = OkpPublicJwk {
                    meta,
                    crv: curve_of(&raw)?,
                    x: required(&raw.x, "x", kty)?,
                };
                Ok(match optional(&raw.d, "d")? {
                    Some(d) => Jwk::OkpPrivate(OkpPrivateJwk { public, d }),
                    None => Jwk::OkpPublic(public),
                })
            }
            "oct" => Ok(Jwk::Oct(OctJwk {
                meta,
                k: required(&raw.k, "k", kty)?,
            })),
            other => Err(JoseError::InvalidKey(format!("unsupported key type '{other}'"))),
        }
    }
}

impl From<Jwk> for RawJwk {
    fn from(jwk: Jwk) -> Self {
        let meta = jwk.metadata().clone();
        let mut raw = RawJwk {
            kty: jwk.kty().as_str().to_string(),
            kid: meta.kid,
            key_use: meta.key_use,
            alg: meta.alg,
            ..RawJwk::default()
        };
        let enc = |bytes: &[u8]| Some(b64url_encode(bytes));
        match &jwk {
            Jwk::EcPublic(k) => {
                raw.crv = Some(k.crv.clone());
                raw.x = enc(&k.x);
                raw.y = enc(&k.y);
            }
            Jwk::EcPrivate(k) => {
                raw.crv = Some(k.public.crv.clone());
                raw.x = enc(&k.public.x);
                raw.y = enc(&k.public.y);
                raw.d = enc(&k.d);
            }
            Jwk::RsaPublic(k) => {
                raw.n = enc(&k.n);
                raw.e = enc(&k.e);
            }
            Jwk::RsaPrivate(k) => {
                raw.n = enc(&k.public.n);
                raw.e = enc(&k.public.e);
                raw.d = enc(&k.d);
                raw.p = enc(&k.p);
                raw.q = enc(&k.q);
                raw.dp = enc(&k.dp);
                raw.dq = enc(&k.dq);
                raw.qi = enc(&k.qi);
            }
            Jwk::OkpPublic(k) => {
                raw.crv = Some(k.crv.clone());
                raw.x = enc(&k.x);
            }
            Jwk::OkpPrivate(k) => {
                raw.crv = Some(k.public.crv.clone());
                raw.x = enc(&k.public.x);
                raw.d = enc(&k.d);
            }
            Jwk::Oct(k) => raw.k = enc(&k.k),
        }
        raw
    }
}
