//! Wrappers around the [sodiumoxide] authenticated encryption primitives.
//!
//! Ciphertexts are laid out as `[12 bytes nonce][ciphertext || 16 bytes tag]` so that they can be
//! sent as a single payload. The nonce is drawn at random for each message.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/
//! [crypto module]: crate::crypto

use sodiumoxide::{crypto::aead::chacha20poly1305_ietf as aead, randombytes::randombytes};
use zeroize::Zeroizing;

/// Number of bytes of the nonce which prefixes every ciphertext.
pub const NONCEBYTES: usize = aead::NONCEBYTES;

/// Number of bytes of the authentication tag which suffixes every ciphertext.
pub const TAGBYTES: usize = aead::TAGBYTES;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("decryption of a message failed")]
/// An error related to the decryption of a message.
pub struct DecryptionError;

#[derive(Clone, Debug)]
/// A `ChaCha20Poly1305` key for symmetric authenticated encryption.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SymmetricKey(aead::Key);

impl From<Zeroizing<[u8; aead::KEYBYTES]>> for SymmetricKey {
    fn from(bytes: Zeroizing<[u8; aead::KEYBYTES]>) -> Self {
        Self(aead::Key(*bytes))
    }
}

impl SymmetricKey {
    /// Encrypts the message `m` under a fresh random nonce.
    ///
    /// The resulting ciphertext length is [`NONCEBYTES`]` + m.len() + `[`TAGBYTES`].
    pub fn seal(&self, m: &[u8]) -> Vec<u8> {
        // safe unwrap: the length of the random bytes matches the nonce length
        let nonce = aead::Nonce::from_slice(&randombytes(NONCEBYTES)).unwrap();
        let mut c = Vec::with_capacity(NONCEBYTES + m.len() + TAGBYTES);
        c.extend_from_slice(nonce.as_ref());
        c.extend_from_slice(&aead::seal(m, None, &nonce, &self.0));
        c
    }

    /// Decrypts and authenticates the ciphertext `c`.
    ///
    /// # Errors
    /// Returns `Err(DecryptionError)` if the ciphertext is too short or if its authentication tag
    /// doesn't match.
    pub fn open(&self, c: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if c.len() < NONCEBYTES + TAGBYTES {
            return Err(DecryptionError);
        }
        let (nonce, sealed) = c.split_at(NONCEBYTES);
        let nonce = aead::Nonce::from_slice(nonce).ok_or(DecryptionError)?;
        aead::open(sealed, None, &nonce, &self.0).map_err(|_| DecryptionError)
    }
}
