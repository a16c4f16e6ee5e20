//! Engine-wide defaults.

use serde::{Deserialize, Serialize};

use crate::error::{JoseError, Result};

/// RSA modulus length used when neither the caller nor the config names one.
pub const DEFAULT_RSA_MODULUS_LENGTH: usize = 2048;

/// Defaults applied when callers leave an algorithm or size unspecified.
///
/// Constructed once and handed to [`CryptoFactory`](crate::crypto::CryptoFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoseConfig {
    /// Content encryption for JWE when no option or key names one.
    pub default_content_encryption: String,
    /// Key encryption for recipient keys that declare no `alg`.
    pub default_key_encryption: String,
    /// Modulus length in bits for generated and derived RSA keys.
    pub default_rsa_modulus_length: usize,
    /// Require every JWS signature entry to verify, not just one.
    pub verify_all_signatures: bool,
}

impl Default for JoseConfig {
    fn default() -> Self {
        Self {
            default_content_encryption: "A256GCM".to_string(),
            default_key_encryption: "RSA-OAEP-256".to_string(),
            default_rsa_modulus_length: DEFAULT_RSA_MODULUS_LENGTH,
            verify_all_signatures: true,
        }
    }
}

impl JoseConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| JoseError::Serialization(e.to_string()))
    }
}
