//! Base64url helpers shared by the key model and the token codecs.
//!
//! JOSE encodes every binary member as base64url without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{JoseError, Result};

/// Encode bytes as unpadded base64url.
pub fn b64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url, naming `field` in the error.
pub fn b64url_decode(value: &str, field: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| JoseError::Serialization(format!("invalid base64url in {field}: {e}")))
}
