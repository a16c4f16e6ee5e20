//! Token serialization formats.

use std::fmt;
use std::str::FromStr;

use crate::error::JoseError;

/// The three JOSE serializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenFormat {
    /// Dot-separated base64url segments; one signature or recipient.
    Compact,
    /// JSON object with a single signature or recipient inlined.
    FlatJson,
    /// JSON object with a `signatures` or `recipients` array.
    GeneralJson,
}

impl TokenFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenFormat::Compact => "Compact",
            TokenFormat::FlatJson => "FlatJson",
            TokenFormat::GeneralJson => "GeneralJson",
        }
    }

    /// Whether the format can carry more than one signature or recipient.
    pub fn is_multi_party(&self) -> bool {
        matches!(self, TokenFormat::GeneralJson)
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenFormat {
    type Err = JoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Compact" | "JwsCompactJson" | "JweCompactJson" => Ok(TokenFormat::Compact),
            "FlatJson" | "JwsFlatJson" | "JweFlatJson" => Ok(TokenFormat::FlatJson),
            "GeneralJson" | "JwsGeneralJson" | "JweGeneralJson" => Ok(TokenFormat::GeneralJson),
            other => Err(JoseError::UnsupportedFormat(other.to_string())),
        }
    }
}
