//! Secure random number generation.
//!
//! Uses the operating system's cryptographic random source via `rand`.

use rand::RngCore;

use crate::algorithms::AES_GCM_IV_LENGTH;

/// Fill a buffer with cryptographically secure random bytes.
fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// Generate `len` cryptographically secure random bytes.
pub fn random_bytes_vec(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf);
    buf
}

/// Generate a random 96-bit AES-GCM initialization vector.
pub fn random_iv() -> Vec<u8> {
    random_bytes_vec(AES_GCM_IV_LENGTH)
}
