//! Wrappers around some of the [sodiumoxide] crypto primitives.
//!
//! The wrappers provide methods defined on structs instead of the sodiumoxide functions. This is
//! done for the `X25519` key agreement key pairs and their shared secrets, the
//! `ChaCha20Poly1305` authenticated encryption of shares and the `SHA256` hash function.
//! Additionally, a `HKDF-SHA256` key derivation and a uniform sampler for big integers are
//! available.
//!
//! # Examples
//! ## Key agreement
//! ```
//! # use secagg_client::crypto::ExchangeKeyPair;
//! let alice = ExchangeKeyPair::generate();
//! let bob = ExchangeKeyPair::generate();
//! let alice_secret = alice.secret.agree(&bob.public).unwrap();
//! let bob_secret = bob.secret.agree(&alice.public).unwrap();
//! assert_eq!(alice_secret, bob_secret);
//! ```
//!
//! ## Encryption of shares
//! ```
//! # use secagg_client::crypto::ExchangeKeyPair;
//! # let alice = ExchangeKeyPair::generate();
//! # let bob = ExchangeKeyPair::generate();
//! let key = alice.secret.agree(&bob.public).unwrap().share_key();
//! let message = b"Hello world!".to_vec();
//! let cipher = key.seal(&message);
//! assert_eq!(message, key.open(&cipher).unwrap());
//! ```
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

pub(crate) mod aead;
pub(crate) mod exchange;
pub(crate) mod hash;
pub(crate) mod kdf;
pub(crate) mod prng;

use sodiumoxide::randombytes::randombytes;

pub use self::{
    aead::{DecryptionError, SymmetricKey, NONCEBYTES, TAGBYTES},
    exchange::{
        ExchangeKeyPair,
        KeyAgreementError,
        PublicExchangeKey,
        SecretExchangeKey,
        SharedSecret,
    },
    hash::Sha256,
    kdf::{derive_key, hkdf_sha256, KdfError},
    prng::generate_integer,
};

/// An interface for slicing into cryptographic byte objects.
pub trait ByteObject: Sized {
    /// Length in bytes of this object
    const LENGTH: usize;

    /// Creates a new object with all the bytes initialized to `0`.
    fn zeroed() -> Self;

    /// Gets the object byte representation.
    fn as_slice(&self) -> &[u8];

    /// Creates an object from the given buffer.
    ///
    /// # Errors
    /// Returns `None` if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice(bytes: &[u8]) -> Option<Self>;

    /// Creates an object from the given buffer.
    ///
    /// # Panics
    /// Panics if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice_unchecked(bytes: &[u8]) -> Self {
        Self::from_slice(bytes).unwrap()
    }

    /// Generates an object with random bytes
    fn generate() -> Self {
        // safe unwrap: length of slice is guaranteed by constants
        Self::from_slice_unchecked(randombytes(Self::LENGTH).as_slice())
    }

    /// A helper for instantiating an object filled with the given value
    fn fill_with(value: u8) -> Self {
        Self::from_slice_unchecked(&vec![value; Self::LENGTH])
    }
}
