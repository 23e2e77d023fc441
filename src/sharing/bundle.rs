//! Bundles of shares held by one participant and their encryption.
//!
//! See the [sharing module] documentation since this is a private module anyways.
//!
//! [sharing module]: crate::sharing

use derive_more::{AsMut, AsRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    crypto::{DecryptionError, SymmetricKey},
    sharing::{
        field::FieldElement,
        serialization::{DecodeError, FromBytes, ToBytes},
        shamir::Share,
    },
    ParticipantIndex,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// The shares of several secrets which are held by the same participant.
pub struct ShareBundle {
    /// The 1-based index of the participant holding the shares.
    pub index: ParticipantIndex,
    /// The values of the shares, one per secret.
    pub values: Vec<FieldElement>,
}

impl ShareBundle {
    pub fn new(index: ParticipantIndex, values: Vec<FieldElement>) -> Self {
        Self { index, values }
    }

    /// Gets the shares of this bundle.
    pub fn shares(&self) -> impl Iterator<Item = Share> + '_ {
        self.values.iter().map(move |value| Share {
            index: self.index,
            value: value.clone(),
        })
    }

    /// Encrypts this bundle with the given key as an [`EncryptedShare`].
    pub fn encrypt(&self, key: &SymmetricKey) -> EncryptedShare {
        EncryptedShare(key.seal(&self.to_vec()))
    }
}

#[derive(Debug, Error)]
/// Errors related to the decryption of an [`EncryptedShare`].
pub enum ShareDecryptionError {
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("the decrypted share bundle is malformed: {0:#}")]
    Decoding(DecodeError),
}

#[derive(AsRef, AsMut, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// An encrypted share bundle.
///
/// The payload is laid out as `[12 bytes nonce][ciphertext || 16 bytes tag]`.
pub struct EncryptedShare(Vec<u8>);

impl From<Vec<u8>> for EncryptedShare {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<EncryptedShare> for Vec<u8> {
    fn from(value: EncryptedShare) -> Self {
        value.0
    }
}

impl EncryptedShare {
    /// Gets the encrypted payload.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Decrypts this payload as a [`ShareBundle`].
    ///
    /// # Errors
    /// Fails if the decryption fails or if the plaintext is not a valid share bundle.
    pub fn decrypt(&self, key: &SymmetricKey) -> Result<ShareBundle, ShareDecryptionError> {
        let plaintext = key.open(self.as_slice())?;
        ShareBundle::from_byte_slice(&plaintext).map_err(ShareDecryptionError::Decoding)
    }
}
