//! Wrappers around the [sodiumoxide] key agreement primitives.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/
//! [crypto module]: crate::crypto

use std::fmt;

use derive_more::{AsMut, AsRef, From};
use serde::{Deserialize, Serialize};
use sodiumoxide::{
    crypto::{box_, scalarmult::curve25519},
    utils::memcmp,
};
use zeroize::Zeroizing;

use super::{aead::SymmetricKey, kdf::derive_key, ByteObject};

/// The `HKDF` info label of the key that encrypts the shares exchanged between two peers.
pub const SHARE_ENCRYPTION_INFO: &[u8] = b"secagg/share-encryption";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A `X25519` key pair for key agreement.
pub struct ExchangeKeyPair {
    /// The `X25519` public key.
    pub public: PublicExchangeKey,
    /// The `X25519` secret key.
    pub secret: SecretExchangeKey,
}

impl ExchangeKeyPair {
    /// Generates a new random `X25519` key pair.
    pub fn generate() -> Self {
        let (pk, sk) = box_::gen_keypair();
        Self {
            public: PublicExchangeKey(pk),
            secret: SecretExchangeKey(sk),
        }
    }
}

#[derive(
    AsRef,
    AsMut,
    From,
    Serialize,
    Deserialize,
    Hash,
    Eq,
    Ord,
    PartialEq,
    Copy,
    Clone,
    PartialOrd,
    Debug,
)]
/// A `X25519` public key.
pub struct PublicExchangeKey(box_::PublicKey);

impl ByteObject for PublicExchangeKey {
    const LENGTH: usize = box_::PUBLICKEYBYTES;

    fn zeroed() -> Self {
        Self(box_::PublicKey([0_u8; box_::PUBLICKEYBYTES]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        box_::PublicKey::from_slice(bytes).map(Self)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("key agreement failed: the public key is a low order point")]
/// An error related to the computation of a shared secret.
pub struct KeyAgreementError;

#[derive(AsRef, AsMut, From, Serialize, Deserialize, Eq, PartialEq, Clone, Debug)]
/// A `X25519` secret key.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SecretExchangeKey(box_::SecretKey);

impl SecretExchangeKey {
    /// Computes the `X25519` shared secret between this secret key and the public key `pk` of a
    /// peer. Both peers of a pair compute the same secret.
    ///
    /// # Errors
    /// Fails if `pk` is a point of low order, which would make the shared secret predictable.
    pub fn agree(&self, pk: &PublicExchangeKey) -> Result<SharedSecret, KeyAgreementError> {
        let scalar = curve25519::Scalar::from_slice(self.as_slice()).ok_or(KeyAgreementError)?;
        let point =
            curve25519::GroupElement::from_slice(pk.as_slice()).ok_or(KeyAgreementError)?;
        let shared = curve25519::scalarmult(&scalar, &point).map_err(|_| KeyAgreementError)?;
        SharedSecret::from_slice(shared.as_ref()).ok_or(KeyAgreementError)
    }

    /// Computes the corresponding public key for this secret key.
    pub fn public_key(&self) -> PublicExchangeKey {
        PublicExchangeKey(self.0.public_key())
    }
}

impl ByteObject for SecretExchangeKey {
    const LENGTH: usize = box_::SECRETKEYBYTES;

    fn zeroed() -> Self {
        Self(box_::SecretKey([0_u8; box_::SECRETKEYBYTES]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        box_::SecretKey::from_slice(bytes).map(Self)
    }
}

#[derive(Clone)]
/// The `X25519` shared secret of two peers.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SharedSecret(Zeroizing<[u8; curve25519::GROUPELEMENTBYTES]>);

impl SharedSecret {
    /// Derives the key which encrypts the shares exchanged with the peer.
    pub fn share_key(&self) -> SymmetricKey {
        SymmetricKey::from(self.derive(SHARE_ENCRYPTION_INFO))
    }

    /// Derives 32 bytes of key material bound to the given `info` label.
    pub fn derive(&self, info: &[u8]) -> Zeroizing<[u8; 32]> {
        derive_key(self.as_slice(), info)
    }
}

impl ByteObject for SharedSecret {
    const LENGTH: usize = curve25519::GROUPELEMENTBYTES;

    fn zeroed() -> Self {
        Self(Zeroizing::new([0_u8; Self::LENGTH]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LENGTH {
            return None;
        }
        let mut secret = Zeroizing::new([0_u8; Self::LENGTH]);
        secret.copy_from_slice(bytes);
        Some(Self(secret))
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        memcmp(self.as_slice(), other.as_slice())
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(****)")
    }
}
