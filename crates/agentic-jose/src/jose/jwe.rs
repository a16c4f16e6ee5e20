//! JSON Web Encryption tokens.
//!
//! Content is sealed once with AES-GCM under a fresh content encryption key
//! (CEK); the CEK is wrapped separately for every recipient. The encoded
//! protected header is the additional authenticated data, extended with the
//! caller's `aad` when present.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::algorithms::{to_descriptor, DescriptorContext};
use crate::crypto::factory::{CapabilityKind, CryptoFactory};
use crate::crypto::operations::{
    decrypt_with_key, decrypt_with_private, encrypt_by_public_key, encrypt_with_key,
    fetch_private_key,
};
use crate::crypto::random::{random_bytes_vec, random_iv};
use crate::encoding::{b64url_decode, b64url_encode};
use crate::error::{JoseError, Result};
use crate::jose::format::TokenFormat;
use crate::jose::header::{Header, ProtectedHeader};
use crate::keys::{Jwk, KeyReference};

/// AES-GCM tag length in bytes, split off the end of the cipher output.
const TAG_BYTES: usize = 16;

/// Knobs for [`JweToken::encrypt`].
#[derive(Clone, Default)]
pub struct JweEncryptOptions {
    /// Content encryption (`enc`); defaults to the configured algorithm.
    pub content_encryption: Option<String>,
    /// Extra protected header members.
    pub protected: Header,
    /// Shared unprotected header members.
    pub unprotected: Header,
    /// External additional authenticated data.
    pub aad: Option<Vec<u8>>,
    /// Fixed content key, for reproducible test vectors only.
    pub content_key: Option<Vec<u8>>,
    /// Fixed IV, for reproducible test vectors only.
    pub iv: Option<Vec<u8>>,
}

impl std::fmt::Debug for JweEncryptOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JweEncryptOptions")
            .field("content_encryption", &self.content_encryption)
            .field("protected", &self.protected)
            .field("unprotected", &self.unprotected)
            .field("aad", &self.aad)
            .field("content_key", &self.content_key.as_ref().map(|_| "[REDACTED]"))
            .field("iv", &self.iv)
            .finish()
    }
}

/// One recipient's wrapped content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JweRecipient {
    header: Header,
    encrypted_key: Vec<u8>,
}

impl JweRecipient {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }
}

/// An encrypted payload addressed to one or more recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JweToken {
    protected: ProtectedHeader,
    unprotected: Header,
    iv: Vec<u8>,
    aad: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
    recipients: Vec<JweRecipient>,
}

impl JweToken {
    pub fn protected(&self) -> &ProtectedHeader {
        &self.protected
    }

    pub fn unprotected(&self) -> &Header {
        &self.unprotected
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn aad(&self) -> &[u8] {
        &self.aad
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    pub fn recipients(&self) -> &[JweRecipient] {
        &self.recipients
    }

    /// Key encryption algorithm for a recipient: its own header first, then
    /// the shared unprotected header, then the protected header.
    pub fn recipient_algorithm<'a>(&'a self, recipient: &'a JweRecipient) -> Option<&'a str> {
        recipient
            .header
            .alg()
            .or_else(|| self.unprotected.alg())
            .or_else(|| self.protected.header().alg())
    }

    fn recipient_kid<'a>(&'a self, recipient: &'a JweRecipient) -> Option<&'a str> {
        recipient.header.kid().or_else(|| {
            // A lone recipient's kid travels in the shared headers.
            (self.recipients.len() == 1)
                .then(|| self.unprotected.kid().or_else(|| self.protected.header().kid()))
                .flatten()
        })
    }

    /// Structural check: ciphertext, IV and at least one recipient, each with
    /// a wrapped key and a resolvable algorithm.
    pub fn is_valid_token(&self) -> bool {
        !self.ciphertext.is_empty()
            && !self.iv.is_empty()
            && !self.recipients.is_empty()
            && self.recipients.iter().all(|recipient| {
                !recipient.encrypted_key.is_empty() && self.recipient_algorithm(recipient).is_some()
            })
    }

    /// Encrypt `payload` to every key in `recipients`.
    ///
    /// Each recipient key's declared `alg` selects its key wrapping; keys
    /// without one use the configured default. The protected header carries
    /// `enc` and the first recipient's `alg`, plus its `kid` when it is the
    /// only recipient. With several recipients each recipient header carries
    /// its own `alg` and `kid`.
    pub async fn encrypt(
        factory: &CryptoFactory,
        recipients: &[Jwk],
        payload: &[u8],
        format: TokenFormat,
        options: &JweEncryptOptions,
    ) -> Result<JweToken> {
        if recipients.is_empty() {
            return Err(JoseError::InvalidArgument("no recipients given".into()));
        }
        if payload.is_empty() {
            return Err(JoseError::InvalidArgument("payload is empty".into()));
        }
        if !format.is_multi_party() && recipients.len() > 1 {
            return Err(JoseError::TooManyRecipients(recipients.len()));
        }
        if format == TokenFormat::Compact && (!options.unprotected.is_empty() || options.aad.is_some())
        {
            return Err(JoseError::InvalidArgument(
                "compact serialization cannot carry unprotected headers or aad".into(),
            ));
        }

        let config = factory.config();
        let enc = options
            .content_encryption
            .clone()
            .unwrap_or_else(|| config.default_content_encryption.clone());
        if CapabilityKind::for_algorithm_name(&enc)? != CapabilityKind::SymmetricEncrypter {
            return Err(JoseError::UnsupportedAlgorithm(enc));
        }

        let key_algorithms = recipients
            .iter()
            .map(|jwk| {
                let alg = jwk
                    .alg()
                    .unwrap_or(config.default_key_encryption.as_str())
                    .to_string();
                match CapabilityKind::for_algorithm_name(&alg)? {
                    CapabilityKind::KeyEncrypter => Ok(alg),
                    _ => Err(JoseError::UnsupportedAlgorithm(alg)),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut header = Header::new()
            .with("alg", key_algorithms[0].as_str())
            .with("enc", enc.as_str());
        let single = recipients.len() == 1;
        if single {
            if let Some(kid) = recipients[0].kid() {
                header.insert("kid", kid);
            }
        }
        header.extend_missing(&options.protected);
        let protected = ProtectedHeader::new(header)?;

        let cek = match &options.content_key {
            Some(key) => Zeroizing::new(key.clone()),
            None => Zeroizing::new(random_bytes_vec(content_key_length(&enc)?)),
        };
        let iv = options.iv.clone().unwrap_or_else(random_iv);
        let aad = options.aad.clone().unwrap_or_default();

        let mut wrapped = Vec::with_capacity(recipients.len());
        for (jwk, alg) in recipients.iter().zip(&key_algorithms) {
            let encrypted_key = encrypt_by_public_key(factory, alg, jwk, &cek).await?;
            let mut recipient_header = Header::new();
            if !single {
                recipient_header.insert("alg", alg.as_str());
                if let Some(kid) = jwk.kid() {
                    recipient_header.insert("kid", kid);
                }
            }
            wrapped.push(JweRecipient {
                header: recipient_header,
                encrypted_key,
            });
        }

        let descriptor = to_descriptor(
            &enc,
            &DescriptorContext::aes_gcm(iv.clone(), authenticated_data(&protected, &aad)),
        )?;
        let mut ciphertext =
            encrypt_with_key(factory, &descriptor, &Jwk::oct(cek.to_vec()), payload).await?;
        if ciphertext.len() < TAG_BYTES {
            return Err(JoseError::CryptoFailure("cipher output shorter than tag".into()));
        }
        let tag = ciphertext.split_off(ciphertext.len() - TAG_BYTES);
        log::debug!("Encrypted {enc} content for {} recipients", wrapped.len());

        Ok(JweToken {
            protected,
            unprotected: options.unprotected.clone(),
            iv,
            aad,
            ciphertext,
            tag,
            recipients: wrapped,
        })
    }

    /// Decrypt with the newest private key stored under `key_reference`.
    ///
    /// Recipients whose `kid` equals the key's `kid` are tried first, then
    /// every other recipient in order. The first unwrap that succeeds
    /// supplies the content key.
    pub async fn decrypt(
        &self,
        factory: &CryptoFactory,
        key_reference: &KeyReference,
    ) -> Result<Vec<u8>> {
        self.check_valid()?;
        let enc = self
            .protected
            .header()
            .enc()
            .ok_or_else(|| JoseError::MissingAlgorithm("protected header enc".into()))?;
        let key = fetch_private_key(factory, key_reference).await?;

        let local_kid = key.kid();
        let (mut order, rest): (Vec<usize>, Vec<usize>) = (0..self.recipients.len())
            .partition(|&i| {
                local_kid.is_some() && self.recipient_kid(&self.recipients[i]) == local_kid
            });
        order.extend(rest);

        let mut cek = None;
        for index in order {
            let recipient = &self.recipients[index];
            let alg = self
                .recipient_algorithm(recipient)
                .ok_or_else(|| JoseError::MissingAlgorithm(format!("recipient {index}")))?;
            let descriptor = to_descriptor(alg, &DescriptorContext::default())?;
            match decrypt_with_private(
                factory,
                &descriptor,
                &key,
                key_reference,
                &recipient.encrypted_key,
            )
            .await
            {
                Ok(unwrapped) => {
                    log::debug!("Recipient {index} content key unwrapped with {alg}");
                    cek = Some(Zeroizing::new(unwrapped));
                    break;
                }
                Err(e) => log::debug!("Recipient {index} did not unwrap: {e}"),
            }
        }
        let cek = cek.ok_or(JoseError::ContentKeyUnrecoverable)?;

        let descriptor = to_descriptor(
            enc,
            &DescriptorContext::aes_gcm(
                self.iv.clone(),
                authenticated_data(&self.protected, &self.aad),
            ),
        )?;
        let mut sealed = Vec::with_capacity(self.ciphertext.len() + self.tag.len());
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);
        decrypt_with_key(factory, &descriptor, &Jwk::oct(cek.to_vec()), &sealed).await
    }

    fn check_valid(&self) -> Result<()> {
        if self.ciphertext.is_empty() {
            return Err(JoseError::MalformedToken("ciphertext".into()));
        }
        if self.iv.is_empty() {
            return Err(JoseError::MalformedToken("iv".into()));
        }
        if self.recipients.is_empty() {
            return Err(JoseError::MalformedToken("recipients".into()));
        }
        if let Some(index) = self
            .recipients
            .iter()
            .position(|r| r.encrypted_key.is_empty())
        {
            return Err(JoseError::MalformedToken(format!(
                "encrypted_key for recipient {index}"
            )));
        }
        Ok(())
    }

    /// Serialize in `format`. Empty headers and empty `aad` are omitted.
    pub fn serialize(&self, format: TokenFormat) -> Result<String> {
        self.check_valid()?;
        if !format.is_multi_party() && self.recipients.len() > 1 {
            return Err(JoseError::TooManyRecipients(self.recipients.len()));
        }
        let first = &self.recipients[0];
        let protected = (!self.protected.encoded().is_empty())
            .then(|| self.protected.encoded().to_string());
        let aad = (!self.aad.is_empty()).then(|| b64url_encode(&self.aad));

        match format {
            TokenFormat::Compact => {
                if !self.unprotected.is_empty() || !first.header.is_empty() || aad.is_some() {
                    return Err(JoseError::InvalidArgument(
                        "compact serialization cannot carry unprotected headers or aad".into(),
                    ));
                }
                Ok(format!(
                    "{}.{}.{}.{}.{}",
                    self.protected.encoded(),
                    b64url_encode(&first.encrypted_key),
                    b64url_encode(&self.iv),
                    b64url_encode(&self.ciphertext),
                    b64url_encode(&self.tag)
                ))
            }
            TokenFormat::FlatJson => to_json(&JweJson {
                protected,
                unprotected: self.unprotected.clone(),
                header: first.header.clone(),
                encrypted_key: Some(b64url_encode(&first.encrypted_key)),
                recipients: None,
                aad,
                iv: Some(b64url_encode(&self.iv)),
                ciphertext: Some(b64url_encode(&self.ciphertext)),
                tag: Some(b64url_encode(&self.tag)),
            }),
            TokenFormat::GeneralJson => to_json(&JweJson {
                protected,
                unprotected: self.unprotected.clone(),
                header: Header::new(),
                encrypted_key: None,
                recipients: Some(
                    self.recipients
                        .iter()
                        .map(|r| RecipientJson {
                            header: r.header.clone(),
                            encrypted_key: Some(b64url_encode(&r.encrypted_key)),
                        })
                        .collect(),
                ),
                aad,
                iv: Some(b64url_encode(&self.iv)),
                ciphertext: Some(b64url_encode(&self.ciphertext)),
                tag: Some(b64url_encode(&self.tag)),
            }),
        }
    }

    /// Parse any of the three serializations.
    ///
    /// Five dot-separated segments are compact. JSON is read in general shape
    /// when it has `recipients`, otherwise in flat shape.
    pub fn deserialize(text: &str) -> Result<JweToken> {
        let text = text.trim();
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() == 5 && !text.starts_with('{') {
            let token = JweToken {
                protected: ProtectedHeader::decode(parts[0])?,
                unprotected: Header::new(),
                iv: b64url_decode(parts[2], "iv")?,
                aad: Vec::new(),
                ciphertext: b64url_decode(parts[3], "ciphertext")?,
                tag: b64url_decode(parts[4], "tag")?,
                recipients: vec![JweRecipient {
                    header: Header::new(),
                    encrypted_key: b64url_decode(parts[1], "encrypted_key")?,
                }],
            };
            token.check_valid()?;
            return Ok(token);
        }

        let json: JweJson = serde_json::from_str(text)
            .map_err(|e| JoseError::Serialization(format!("JWE JSON: {e}")))?;
        let required = |value: Option<String>, field: &str| -> Result<Vec<u8>> {
            let value = value.ok_or_else(|| JoseError::MalformedToken(field.to_string()))?;
            b64url_decode(&value, field)
        };

        let entries = match json.recipients {
            Some(entries) if !entries.is_empty() => entries,
            Some(_) => return Err(JoseError::MalformedToken("recipients".into())),
            None => vec![RecipientJson {
                header: json.header,
                encrypted_key: json.encrypted_key,
            }],
        };
        let recipients = entries
            .into_iter()
            .map(|entry| {
                Ok(JweRecipient {
                    header: entry.header,
                    encrypted_key: required(entry.encrypted_key, "encrypted_key")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let token = JweToken {
            protected: ProtectedHeader::decode(json.protected.as_deref().unwrap_or_default())?,
            unprotected: json.unprotected,
            iv: required(json.iv, "iv")?,
            aad: match json.aad {
                Some(aad) => b64url_decode(&aad, "aad")?,
                None => Vec::new(),
            },
            ciphertext: required(json.ciphertext, "ciphertext")?,
            tag: required(json.tag, "tag")?,
            recipients,
        };
        token.check_valid()?;
        Ok(token)
    }
}

/// `ASCII(protected)` or `ASCII(protected || '.' || BASE64URL(aad))`.
fn authenticated_data(protected: &ProtectedHeader, aad: &[u8]) -> Vec<u8> {
    if aad.is_empty() {
        protected.encoded().as_bytes().to_vec()
    } else {
        format!("{}.{}", protected.encoded(), b64url_encode(aad)).into_bytes()
    }
}

fn content_key_length(enc: &str) -> Result<usize> {
    match enc {
        "A128GCM" => Ok(16),
        "A192GCM" => Ok(24),
        "A256GCM" => Ok(32),
        other => Err(JoseError::UnsupportedAlgorithm(other.to_string())),
    }
}

// ── JSON shapes ──────────────────────────────────────────────────────────────

/// Superset of the general and flat JSON shapes.
#[derive(Debug, Serialize, Deserialize)]
struct JweJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<String>,
    #[serde(default, skip_serializing_if = "Header::is_empty")]
    unprotected: Header,
    #[serde(default, skip_serializing_if = "Header::is_empty")]
    header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipients: Option<Vec<RecipientJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ciphertext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecipientJson {
    #[serde(default, skip_serializing_if = "Header::is_empty")]
    header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_key: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| JoseError::Serialization(e.to_string()))
}
