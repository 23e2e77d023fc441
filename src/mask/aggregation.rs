//! Aggregation of masked vectors and removal of self masks.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use thiserror::Error;

use crate::mask::{
    seed::SelfSeed,
    vector::{InvalidModRangeError, ModVector, ELEMENT_BYTES},
};

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors related to the aggregation of masked vectors.
pub enum AggregationError {
    #[error("the masked vector has {actual} bytes, but the aggregation expects {expected} bytes")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("there is no masked vector to unmask")]
    NoVectors,

    #[error(transparent)]
    InvalidModRange(#[from] InvalidModRangeError),
}

#[derive(Debug, Clone)]
/// An aggregator for masked vectors.
///
/// The aggregator sums the masked vectors of the participants modulo the mask range. The pairwise
/// masks of participants which uploaded their vectors cancel out in the sum, while every self mask
/// must be removed with the seed recovered from the revealed shares.
pub struct Aggregation {
    nb_vectors: usize,
    byte_len: usize,
    sum: ModVector,
}

#[allow(clippy::len_without_is_empty)]
impl Aggregation {
    /// Creates a new, empty aggregator for masked vectors of `byte_len` bytes.
    ///
    /// # Errors
    /// Fails if `mod_range` is not within `[1, 2^32]`.
    pub fn new(mod_range: u64, byte_len: usize) -> Result<Self, AggregationError> {
        // a trailing partial group occupies a whole element
        let len = (byte_len + ELEMENT_BYTES - 1) / ELEMENT_BYTES;
        Ok(Self {
            nb_vectors: 0,
            byte_len,
            sum: ModVector::zeros(len, mod_range)?,
        })
    }

    /// Gets the byte length of the aggregated vectors.
    pub fn len(&self) -> usize {
        self.byte_len
    }

    /// Gets the number of aggregated vectors.
    pub fn nb_vectors(&self) -> usize {
        self.nb_vectors
    }

    /// Validates if the aggregation with the given masked vector may be safely performed.
    ///
    /// # Errors
    /// Fails if the length of the masked vector differs from the length of the aggregation.
    pub fn validate_aggregation(&self, masked: &[u8]) -> Result<(), AggregationError> {
        if masked.len() == self.byte_len {
            Ok(())
        } else {
            Err(AggregationError::LengthMismatch {
                expected: self.byte_len,
                actual: masked.len(),
            })
        }
    }

    /// Adds the `masked` vector to the aggregation.
    ///
    /// # Errors
    /// Fails if [`validate_aggregation()`] fails.
    ///
    /// [`validate_aggregation()`]: Aggregation::validate_aggregation
    pub fn aggregate(&mut self, masked: &[u8]) -> Result<(), AggregationError> {
        self.validate_aggregation(masked)?;
        // safe unwraps: the mask range was checked on creation and the element counts agree since
        // the byte lengths agree
        let masked = ModVector::from_bytes(masked, self.sum.mod_range()).unwrap();
        self.sum.add_mask(masked.elements()).unwrap();
        self.nb_vectors += 1;
        Ok(())
    }

    /// Removes the self mask which is derived from the `seed` from the aggregation.
    ///
    /// # Errors
    /// Fails if no masked vector has been aggregated yet.
    pub fn remove_self_mask(&mut self, seed: &SelfSeed) -> Result<(), AggregationError> {
        if self.nb_vectors == 0 {
            return Err(AggregationError::NoVectors);
        }
        let mask = seed.derive_mask(self.sum.len(), self.sum.mod_range());
        // safe unwrap: the mask is derived with the length of the aggregation
        self.sum.sub_mask(&mask).unwrap();
        Ok(())
    }

    /// Gets the aggregated elements.
    pub fn elements(&self) -> &[u32] {
        self.sum.elements()
    }

    /// Encodes the aggregation as big endian bytes of the length of the aggregated vectors.
    pub fn into_bytes(self) -> Vec<u8> {
        self.sum.to_bytes(self.byte_len)
    }
}
