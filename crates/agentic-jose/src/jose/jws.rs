//! JSON Web Signature tokens.
//!
//! A token is either produced by [`JwsToken::sign`] or read back with
//! [`JwsToken::deserialize`]; both return a new value. Signing an existing
//! token appends a signature entry and leaves the original untouched.

use serde::{Deserialize, Serialize};

use crate::algorithms::{to_descriptor, DescriptorContext};
use crate::crypto::factory::CryptoFactory;
use crate::crypto::operations::{fetch_private_key, sign_with_private, verify_by_public_key};
use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{JoseError, Result};
use crate::jose::format::TokenFormat;
use crate::jose::header::{Header, ProtectedHeader};
use crate::keys::{Jwk, KeyReference};

/// Extra header members for one signature.
#[derive(Debug, Clone, Default)]
pub struct JwsSignOptions {
    /// Members added to the protected header after `alg` and `kid`.
    pub protected: Header,
    /// Unprotected per-signature members.
    pub header: Header,
}

/// One signer's entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsSignature {
    protected: ProtectedHeader,
    header: Header,
    signature: Vec<u8>,
}

impl JwsSignature {
    pub fn protected(&self) -> &ProtectedHeader {
        &self.protected
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// `alg` from the unprotected header, else from the protected header.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.alg().or_else(|| self.protected.header().alg())
    }

    /// `kid` from the unprotected header, else from the protected header.
    pub fn kid(&self) -> Option<&str> {
        self.header.kid().or_else(|| self.protected.header().kid())
    }

    fn signing_input(&self, payload: &[u8]) -> Vec<u8> {
        signing_input(&self.protected, payload)
    }
}

fn signing_input(protected: &ProtectedHeader, payload: &[u8]) -> Vec<u8> {
    format!("{}.{}", protected.encoded(), b64url_encode(payload)).into_bytes()
}

/// A signed payload with one or more signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JwsToken {
    payload: Vec<u8>,
    signatures: Vec<JwsSignature>,
}

impl JwsToken {
    /// An unsigned token over `payload`.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            signatures: Vec::new(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signatures(&self) -> &[JwsSignature] {
        &self.signatures
    }

    /// Sign with the newest key stored under `key_reference`.
    ///
    /// The algorithm is the key's declared `alg`. Returns a new token with
    /// the signature appended. `format` is the serialization the caller
    /// intends; single-signature formats refuse a second signature here.
    pub async fn sign(
        &self,
        factory: &CryptoFactory,
        key_reference: &KeyReference,
        format: TokenFormat,
        options: &JwsSignOptions,
    ) -> Result<JwsToken> {
        if !format.is_multi_party() && !self.signatures.is_empty() {
            return Err(JoseError::TooManySignatures(self.signatures.len() + 1));
        }
        if format == TokenFormat::Compact && !options.header.is_empty() {
            return Err(JoseError::InvalidArgument(
                "compact serialization cannot carry an unprotected header".into(),
            ));
        }

        let key = fetch_private_key(factory, key_reference).await?;
        let algorithm = key
            .alg()
            .ok_or_else(|| JoseError::MissingAlgorithm(format!("key {key_reference}")))?
            .to_string();
        let descriptor = to_descriptor(&algorithm, &DescriptorContext::default())?;

        let mut header = Header::new().with("alg", algorithm.as_str());
        if let Some(kid) = key.kid() {
            header.insert("kid", kid);
        }
        header.extend_missing(&options.protected);
        let protected = ProtectedHeader::new(header)?;

        let input = signing_input(&protected, &self.payload);
        let signature = sign_with_private(factory, &descriptor, &key, key_reference, &input).await?;
        log::debug!(
            "Added {algorithm} signature #{} from {key_reference}",
            self.signatures.len() + 1
        );

        let mut signed = self.clone();
        signed.signatures.push(JwsSignature {
            protected,
            header: options.header.clone(),
            signature,
        });
        Ok(signed)
    }

    /// Verify every signature entry against `candidate_keys`.
    ///
    /// Each entry is tried against every candidate until one matches. With
    /// `verify_all_signatures` configured (the default) all entries must
    /// verify, otherwise one is enough. `payload` supplies a detached
    /// payload; when the token carries one too they must agree.
    pub async fn verify(
        &self,
        factory: &CryptoFactory,
        candidate_keys: &[Jwk],
        payload: Option<&[u8]>,
    ) -> Result<bool> {
        if self.signatures.is_empty() {
            return Err(JoseError::MalformedToken("signatures".into()));
        }
        let payload = match payload {
            Some(detached) if self.payload.is_empty() => detached,
            Some(detached) if detached != self.payload.as_slice() => {
                return Err(JoseError::InvalidArgument(
                    "supplied payload differs from the token payload".into(),
                ))
            }
            _ => self.payload.as_slice(),
        };

        let mut verified = 0;
        for (index, entry) in self.signatures.iter().enumerate() {
            let algorithm = entry
                .algorithm()
                .ok_or_else(|| JoseError::MissingAlgorithm(format!("signature {index}")))?;
            let input = entry.signing_input(payload);

            let mut matched = false;
            for key in candidate_keys {
                match verify_by_public_key(factory, algorithm, key, &entry.signature, &input).await
                {
                    Ok(true) => {
                        matched = true;
                        break;
                    }
                    Ok(false) => {}
                    // A candidate of another key family or curve simply does not match.
                    Err(JoseError::InvalidKey(reason) | JoseError::UnsupportedCurve(reason)) => {
                        log::debug!("Skipping candidate for signature {index}: {reason}");
                    }
                    Err(e) => return Err(e),
                }
            }

            if matched {
                verified += 1;
            } else if factory.config().verify_all_signatures {
                log::debug!("Signature {index} ({algorithm}) matched no candidate key");
                return Ok(false);
            }
        }
        Ok(verified > 0)
    }

    /// Serialize in `format`. Empty headers are omitted.
    pub fn serialize(&self, format: TokenFormat) -> Result<String> {
        let first = self
            .signatures
            .first()
            .ok_or_else(|| JoseError::MalformedToken("signature".into()))?;
        if !format.is_multi_party() && self.signatures.len() > 1 {
            return Err(JoseError::TooManySignatures(self.signatures.len()));
        }
        let payload = b64url_encode(&self.payload);

        match format {
            TokenFormat::Compact => {
                if !first.header.is_empty() {
                    return Err(JoseError::InvalidArgument(
                        "compact serialization cannot carry an unprotected header".into(),
                    ));
                }
                Ok(format!(
                    "{}.{}.{}",
                    first.protected.encoded(),
                    payload,
                    b64url_encode(&first.signature)
                ))
            }
            TokenFormat::FlatJson => {
                let entry = SignatureJson::from(first);
                to_json(&JwsJson {
                    payload: Some(payload),
                    signatures: None,
                    protected: entry.protected,
                    header: entry.header,
                    signature: entry.signature,
                })
            }
            TokenFormat::GeneralJson => to_json(&JwsJson {
                payload: Some(payload),
                signatures: Some(self.signatures.iter().map(SignatureJson::from).collect()),
                protected: None,
                header: Header::new(),
                signature: None,
            }),
        }
    }

    /// Parse any of the three serializations.
    ///
    /// Three dot-separated segments are compact; anything else must be a
    /// JSON object in general shape, falling back to flat shape.
    pub fn deserialize(text: &str) -> Result<JwsToken> {
        let text = text.trim();
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() == 3 && !text.starts_with('{') {
            if parts[2].is_empty() {
                return Err(JoseError::MalformedToken("signature".into()));
            }
            return Ok(JwsToken {
                payload: b64url_decode(parts[1], "payload")?,
                signatures: vec![JwsSignature {
                    protected: ProtectedHeader::decode(parts[0])?,
                    header: Header::new(),
                    signature: b64url_decode(parts[2], "signature")?,
                }],
            });
        }

        let json: JwsJson = serde_json::from_str(text)
            .map_err(|e| JoseError::Serialization(format!("JWS JSON: {e}")))?;
        let payload = json
            .payload
            .as_deref()
            .ok_or_else(|| JoseError::MalformedToken("payload".into()))?;
        let payload = b64url_decode(payload, "payload")?;

        let entries = match json.signatures {
            Some(entries) if !entries.is_empty() => entries,
            Some(_) => return Err(JoseError::MalformedToken("signatures".into())),
            None => vec![SignatureJson {
                protected: json.protected,
                header: json.header,
                signature: json.signature,
            }],
        };
        let signatures = entries
            .into_iter()
            .map(JwsSignature::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(JwsToken {
            payload,
            signatures,
        })
    }
}

// ── JSON shapes ──────────────────────────────────────────────────────────────

/// Superset of the general and flat JSON shapes.
#[derive(Debug, Serialize, Deserialize)]
struct JwsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signatures: Option<Vec<SignatureJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Header::is_empty")]
    header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SignatureJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Header::is_empty")]
    header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

impl From<&JwsSignature> for SignatureJson {
    fn from(entry: &JwsSignature) -> Self {
        let protected = (!entry.protected.encoded().is_empty())
            .then(|| entry.protected.encoded().to_string());
        SignatureJson {
            protected,
            header: entry.header.clone(),
            signature: Some(b64url_encode(&entry.signature)),
        }
    }
}

impl TryFrom<SignatureJson> for JwsSignature {
    type Error = JoseError;

    fn try_from(json: SignatureJson) -> Result<Self> {
        let signature = json
            .signature
            .ok_or_else(|| JoseError::MalformedToken("signature".into()))?;
        Ok(JwsSignature {
            protected: ProtectedHeader::decode(json.protected.as_deref().unwrap_or_default())?,
            header: json.header,
            signature: b64url_decode(&signature, "signature")?,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| JoseError::Serialization(e.to_string()))
}
