//! JOSE token protocol: JWS and JWE in compact, flat JSON and general JSON
//! serializations.

pub mod format;
pub mod header;
pub mod jwe;
pub mod jws;

pub use format::TokenFormat;
pub use header::{Header, ProtectedHeader};
pub use jwe::{JweEncryptOptions, JweRecipient, JweToken};
pub use jws::{JwsSignOptions, JwsSignature, JwsToken};
