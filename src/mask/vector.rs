//! Vectors of integers in the masking group.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use thiserror::Error;

use crate::common::MAX_MOD_RANGE;

/// The number of bytes of a serialized element.
pub const ELEMENT_BYTES: usize = 4;

/// Decodes a byte payload as big endian 32 bit integers.
///
/// A trailing partial group of fewer than [`ELEMENT_BYTES`] bytes is padded with zeros.
pub fn decode_elements(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(ELEMENT_BYTES)
        .map(|chunk| {
            let mut word = [0_u8; ELEMENT_BYTES];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_be_bytes(word)
        })
        .collect()
}

/// Encodes integers as big endian bytes.
///
/// The output is truncated to `len` bytes, or padded with zeros if the elements are too few.
pub fn encode_elements(elements: &[u32], len: usize) -> Vec<u8> {
    let mut bytes = elements
        .iter()
        .flat_map(|element| element.to_be_bytes().to_vec())
        .collect::<Vec<_>>();
    bytes.resize(len, 0);
    bytes
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("the mask has {actual} elements, but the vector has {expected} elements")]
/// An error related to masks of the wrong length.
pub struct LengthMismatchError {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("the mask range {0} is not within [1, 2^32]")]
/// An error related to mask ranges which don't fit the 32 bit elements.
pub struct InvalidModRangeError(pub u64);

/// Checks that `mod_range` is within `[1, 2^32]`.
pub(crate) fn check_mod_range(mod_range: u64) -> Result<(), InvalidModRangeError> {
    if 0 < mod_range && mod_range <= MAX_MOD_RANGE {
        Ok(())
    } else {
        Err(InvalidModRangeError(mod_range))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A vector of integers in `[0, mod_range)`, which are added and subtracted modulo `mod_range`.
pub struct ModVector {
    mod_range: u64,
    data: Vec<u32>,
}

impl ModVector {
    /// Creates a vector from integers, reducing them modulo `mod_range`.
    ///
    /// # Errors
    /// Fails if `mod_range` is not within `[1, 2^32]`.
    pub fn from_elements(elements: Vec<u32>, mod_range: u64) -> Result<Self, InvalidModRangeError> {
        check_mod_range(mod_range)?;
        let data = elements
            .into_iter()
            .map(|element| reduce(u64::from(element), mod_range))
            .collect();
        Ok(Self { mod_range, data })
    }

    /// Creates a vector from a byte payload of big endian 32 bit integers, reducing them modulo
    /// `mod_range`.
    ///
    /// # Errors
    /// Fails if `mod_range` is not within `[1, 2^32]`.
    pub fn from_bytes(bytes: &[u8], mod_range: u64) -> Result<Self, InvalidModRangeError> {
        Self::from_elements(decode_elements(bytes), mod_range)
    }

    /// Creates a vector of `len` zeros.
    ///
    /// # Errors
    /// Fails if `mod_range` is not within `[1, 2^32]`.
    pub fn zeros(len: usize, mod_range: u64) -> Result<Self, InvalidModRangeError> {
        check_mod_range(mod_range)?;
        Ok(Self {
            mod_range,
            data: vec![0; len],
        })
    }

    pub fn mod_range(&self) -> u64 {
        self.mod_range
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gets the elements of the vector.
    pub fn elements(&self) -> &[u32] {
        &self.data
    }

    /// Adds the `mask` element-wise.
    ///
    /// # Errors
    /// Fails if the `mask` and the vector differ in length.
    pub fn add_mask(&mut self, mask: &[u32]) -> Result<(), LengthMismatchError> {
        self.check_length(mask)?;
        let mod_range = self.mod_range;
        for (element, mask) in self.data.iter_mut().zip(mask) {
            *element = reduce(u64::from(*element) + u64::from(*mask), mod_range);
        }
        Ok(())
    }

    /// Subtracts the `mask` element-wise.
    ///
    /// # Errors
    /// Fails if the `mask` and the vector differ in length.
    pub fn sub_mask(&mut self, mask: &[u32]) -> Result<(), LengthMismatchError> {
        self.check_length(mask)?;
        let mod_range = self.mod_range;
        for (element, mask) in self.data.iter_mut().zip(mask) {
            let mask = reduce(u64::from(*mask), mod_range);
            *element = reduce(u64::from(*element) + mod_range - u64::from(mask), mod_range);
        }
        Ok(())
    }

    /// Encodes the vector as big endian bytes, truncated to `len` bytes.
    pub fn to_bytes(&self, len: usize) -> Vec<u8> {
        encode_elements(&self.data, len)
    }

    fn check_length(&self, mask: &[u32]) -> Result<(), LengthMismatchError> {
        if mask.len() == self.data.len() {
            Ok(())
        } else {
            Err(LengthMismatchError {
                expected: self.data.len(),
                actual: mask.len(),
            })
        }
    }
}

impl From<ModVector> for Vec<u32> {
    fn from(vector: ModVector) -> Self {
        vector.data
    }
}

/// Reduces `value` modulo a checked `mod_range`.
fn reduce(value: u64, mod_range: u64) -> u32 {
    // the remainder is smaller than mod_range <= 2^32
    (value % mod_range) as u32
}
