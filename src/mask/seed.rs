//! Self mask seed, its sharing and mask generation.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use derive_more::{AsMut, AsRef};
use num::bigint::BigUint;
use sodiumoxide::crypto::box_;
use thiserror::Error;

use crate::{
    crypto::ByteObject,
    mask::prg::prg,
    sharing::{reconstruct_multiple, split_multiple, ShareBundle, SharingError},
};

/// The number of bytes of a seed limb. Limbs of 15 bytes are smaller than `2^120` and thus always
/// elements of the sharing field.
pub const SEED_LIMB_BYTES: usize = 15;

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors related to the recovery of a seed from its shares.
pub enum SeedRecoveryError {
    #[error(transparent)]
    Sharing(#[from] SharingError),

    #[error("the shares don't reconstruct a valid seed")]
    InvalidSeed,
}

#[derive(AsRef, AsMut, Clone, Debug, PartialEq, Eq)]
/// A seed to generate the self mask of a participant.
///
/// When this goes out of scope, its contents will be zeroed out.
pub struct SelfSeed(box_::Seed);

impl ByteObject for SelfSeed {
    const LENGTH: usize = box_::SEEDBYTES;

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        box_::Seed::from_slice(bytes).map(Self)
    }

    fn zeroed() -> Self {
        Self(box_::Seed([0_u8; Self::LENGTH]))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl SelfSeed {
    /// Derives the self mask of given length in `[0, mod_range)` from this seed.
    pub fn derive_mask(&self, len: usize, mod_range: u64) -> Vec<u32> {
        prg(self.as_slice(), mod_range, len)
    }

    /// Cuts this seed into big endian limbs of [`SEED_LIMB_BYTES`] bytes, the last one possibly
    /// shorter, which are secrets of the sharing field.
    pub fn to_secrets(&self) -> Vec<BigUint> {
        self.as_slice()
            .chunks(SEED_LIMB_BYTES)
            .map(BigUint::from_bytes_be)
            .collect()
    }

    /// Reassembles a seed from its limbs.
    ///
    /// # Errors
    /// Fails if the number of limbs is wrong or if a limb doesn't fit into its bytes.
    pub fn from_secrets(secrets: &[BigUint]) -> Result<Self, SeedRecoveryError> {
        let limbs = (0..Self::LENGTH).step_by(SEED_LIMB_BYTES);
        if secrets.len() != limbs.len() {
            return Err(SeedRecoveryError::InvalidSeed);
        }

        let mut bytes = [0_u8; box_::SEEDBYTES];
        for (start, secret) in limbs.zip(secrets) {
            let end = (start + SEED_LIMB_BYTES).min(Self::LENGTH);
            let limb = secret.to_bytes_be();
            if limb.len() > end - start {
                return Err(SeedRecoveryError::InvalidSeed);
            }
            bytes[end - limb.len()..end].copy_from_slice(&limb);
        }
        let seed = Self::from_slice(&bytes).ok_or(SeedRecoveryError::InvalidSeed);
        sodiumoxide::utils::memzero(&mut bytes);
        seed
    }

    /// Shares this seed among `total_shares` participants, any `threshold` of which can recover
    /// it.
    ///
    /// # Errors
    /// Fails if the parameters don't satisfy `1 <= threshold <= total_shares`.
    pub fn share(&self, threshold: u32, total_shares: u32) -> Result<Vec<ShareBundle>, SharingError> {
        split_multiple(&self.to_secrets(), threshold, total_shares)
    }

    /// Recovers a seed from the share bundles of at least `threshold` participants.
    ///
    /// # Errors
    /// Fails if the bundles can't be interpolated or don't interpolate to a seed. Bundles of
    /// fewer than `threshold` participants usually fail, but they may also yield a wrong seed.
    pub fn from_bundles(bundles: &[ShareBundle]) -> Result<Self, SeedRecoveryError> {
        Self::from_secrets(&reconstruct_multiple(bundles)?)
    }
}
