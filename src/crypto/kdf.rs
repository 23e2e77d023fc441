//! `HKDF-SHA256` key derivation on top of the [sodiumoxide] `HMAC-SHA256` primitive.
//!
//! The derivation follows RFC 5869 without a salt, i.e. the salt is the all-zero string of the
//! hash length, so that the derived keys agree with any standard `HKDF-SHA256` implementation.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/
//! [crypto module]: crate::crypto

use sodiumoxide::crypto::auth::hmacsha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// The output length of the underlying hash function.
pub const HASH_LENGTH: usize = hmacsha256::TAGBYTES;

/// The maximal output length of a single expansion.
pub const MAX_OUTPUT_LENGTH: usize = 255 * HASH_LENGTH;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("requested {0} bytes of key material, at most {} are possible", MAX_OUTPUT_LENGTH)]
/// An error related to an invalid key derivation request.
pub struct KdfError(pub usize);

fn extract(ikm: &[u8]) -> hmacsha256::Key {
    let salt = hmacsha256::Key([0_u8; hmacsha256::KEYBYTES]);
    let prk = hmacsha256::authenticate(ikm, &salt);
    hmacsha256::Key(prk.0)
}

/// Derives `length` bytes of key material from the input key material `ikm`, bound to `info`.
///
/// # Errors
/// Fails if more than [`MAX_OUTPUT_LENGTH`] bytes are requested.
pub fn hkdf_sha256(ikm: &[u8], info: &[u8], length: usize) -> Result<Zeroizing<Vec<u8>>, KdfError> {
    if length > MAX_OUTPUT_LENGTH {
        return Err(KdfError(length));
    }

    let prk = extract(ikm);
    let mut okm = Zeroizing::new(Vec::with_capacity(length));
    let mut block = Zeroizing::new(Vec::with_capacity(HASH_LENGTH + info.len() + 1));
    let mut previous = Zeroizing::new(Vec::with_capacity(HASH_LENGTH));
    let mut counter = 1_u8;
    while okm.len() < length {
        block.clear();
        block.extend_from_slice(&previous);
        block.extend_from_slice(info);
        block.push(counter);
        let tag = hmacsha256::authenticate(&block, &prk);
        let missing = length - okm.len();
        okm.extend_from_slice(&tag.0[..missing.min(HASH_LENGTH)]);
        previous.clear();
        previous.extend_from_slice(&tag.0);
        counter = counter.wrapping_add(1);
    }
    Ok(okm)
}

/// Derives a 32 bytes key from the input key material `ikm`, bound to `info`.
pub fn derive_key(ikm: &[u8], info: &[u8]) -> Zeroizing<[u8; 32]> {
    // safe unwrap: a single block is within the maximal output length
    let okm = hkdf_sha256(ikm, info, 32).unwrap();
    let mut key = Zeroizing::new([0_u8; 32]);
    key.copy_from_slice(&okm);
    key
}
