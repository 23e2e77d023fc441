//! Serialization of shares and share bundles.
//!
//! A share is serialized as
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       participant index                       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! +                                                               +
//! |                      value (16 bytes)                         |
//! +                                                               +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        modulus length                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   modulus (modulus length bytes)              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! where all integers are big endian. A share bundle is the concatenation of its shares.
//!
//! See the [sharing module] documentation since this is a private module anyways.
//!
//! [sharing module]: crate::sharing

use std::{convert::TryInto, ops::Range};

use anyhow::{anyhow, Context};
use num::bigint::BigUint;

use crate::sharing::{
    bundle::ShareBundle,
    field::{field_prime, FieldElement, FIELD_ELEMENT_BYTES},
    shamir::Share,
};

/// An error related to the deserialization of shares.
pub type DecodeError = anyhow::Error;

/// Creates a range from `start` to `start + length`.
pub(crate) const fn range(start: usize, length: usize) -> Range<usize> {
    start..(start + length)
}

const INDEX_FIELD: Range<usize> = range(0, 4);
const VALUE_FIELD: Range<usize> = range(INDEX_FIELD.end, FIELD_ELEMENT_BYTES);
const MODULUS_LENGTH_FIELD: Range<usize> = range(VALUE_FIELD.end, 4);

/// The length of the fixed size header of a serialized share.
pub const SHARE_HEADER_LENGTH: usize = MODULUS_LENGTH_FIELD.end;

/// An interface for serializable types.
///
/// See also [`FromBytes`] for deserialization.
pub trait ToBytes {
    /// The length of the buffer for encoding the type.
    fn buffer_length(&self) -> usize;

    /// Serialize the type in the given buffer.
    ///
    /// # Panics
    /// This method may panic if the given buffer is too small. Thus, [`buffer_length()`] must be
    /// called prior to calling this, and a large enough buffer must be provided.
    ///
    /// [`buffer_length()`]: ToBytes::buffer_length
    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T);

    /// Serialize the type in a newly allocated buffer.
    fn to_vec(&self) -> Vec<u8> {
        let mut buffer = vec![0_u8; self.buffer_length()];
        self.to_bytes(&mut buffer);
        buffer
    }
}

/// An interface for deserializable types.
///
/// See also [`ToBytes`] for serialization.
pub trait FromBytes: Sized {
    /// Deserialize the type from the given buffer.
    ///
    /// # Errors
    /// May fail if the buffer is malformed.
    fn from_byte_slice<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError>;
}

/// A buffer for serialized shares.
pub struct ShareBuffer<T> {
    inner: T,
}

impl<T: AsRef<[u8]>> ShareBuffer<T> {
    /// Creates a new buffer from `bytes`.
    ///
    /// # Errors
    /// Fails if the `bytes` don't conform to the required buffer length for shares.
    pub fn new(bytes: T) -> Result<Self, DecodeError> {
        let buffer = Self { inner: bytes };
        buffer
            .check_buffer_length()
            .context("not a valid share")?;
        Ok(buffer)
    }

    /// Creates a new buffer from `bytes`.
    pub fn new_unchecked(bytes: T) -> Self {
        Self { inner: bytes }
    }

    /// Checks if this buffer conforms to the required buffer length for shares.
    ///
    /// # Errors
    /// Fails if the buffer is too small.
    pub fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.inner.as_ref().len();
        if len < SHARE_HEADER_LENGTH {
            return Err(anyhow!(
                "invalid buffer length: {} < {}",
                len,
                SHARE_HEADER_LENGTH
            ));
        }
        let expected = self.len();
        if len < expected {
            return Err(anyhow!(
                "invalid buffer length: expected {} bytes but buffer has only {} bytes",
                expected,
                len
            ));
        }
        Ok(())
    }

    /// Gets the number of bytes of the serialized share, including its modulus.
    ///
    /// # Panics
    /// May panic if the buffer is smaller than the share header.
    pub fn len(&self) -> usize {
        SHARE_HEADER_LENGTH + self.modulus_length()
    }

    /// Gets the participant index.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn index(&self) -> u32 {
        // safe unwrap: the slice is exactly 4 bytes long
        u32::from_be_bytes(self.inner.as_ref()[INDEX_FIELD].try_into().unwrap())
    }

    /// Gets the serialized share value.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn value(&self) -> &[u8] {
        &self.inner.as_ref()[VALUE_FIELD]
    }

    /// Gets the length of the serialized modulus.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn modulus_length(&self) -> usize {
        // safe unwrap: the slice is exactly 4 bytes long
        u32::from_be_bytes(self.inner.as_ref()[MODULUS_LENGTH_FIELD].try_into().unwrap()) as usize
    }

    /// Gets the serialized modulus.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn modulus(&self) -> &[u8] {
        &self.inner.as_ref()[MODULUS_LENGTH_FIELD.end..self.len()]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> ShareBuffer<T> {
    /// Sets the participant index.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_index(&mut self, index: u32) {
        self.inner.as_mut()[INDEX_FIELD].copy_from_slice(&index.to_be_bytes());
    }

    /// Gets the serialized share value.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn value_mut(&mut self) -> &mut [u8] {
        &mut self.inner.as_mut()[VALUE_FIELD]
    }

    /// Sets the length of the serialized modulus.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_modulus_length(&mut self, length: u32) {
        self.inner.as_mut()[MODULUS_LENGTH_FIELD].copy_from_slice(&length.to_be_bytes());
    }

    /// Gets the serialized modulus.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn modulus_mut(&mut self) -> &mut [u8] {
        let end = self.len();
        &mut self.inner.as_mut()[MODULUS_LENGTH_FIELD.end..end]
    }
}

impl ToBytes for Share {
    fn buffer_length(&self) -> usize {
        SHARE_HEADER_LENGTH + field_prime().to_bytes_be().len()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let modulus = field_prime().to_bytes_be();
        let mut writer = ShareBuffer::new_unchecked(buffer.as_mut());
        writer.set_index(self.index);
        writer
            .value_mut()
            .copy_from_slice(&self.value.to_be_bytes());
        writer.set_modulus_length(modulus.len() as u32);
        writer.modulus_mut().copy_from_slice(&modulus);
    }
}

impl FromBytes for Share {
    fn from_byte_slice<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let reader = ShareBuffer::new(buffer.as_ref())?;
        if reader.modulus() != field_prime().to_bytes_be().as_slice() {
            return Err(anyhow!("the share belongs to a different field"));
        }
        let value = FieldElement::new(BigUint::from_bytes_be(reader.value()))
            .ok_or_else(|| anyhow!("the share value is not an element of the field"))?;
        Ok(Share {
            index: reader.index(),
            value,
        })
    }
}

impl ToBytes for ShareBundle {
    fn buffer_length(&self) -> usize {
        self.shares().map(|share| share.buffer_length()).sum()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let buffer = buffer.as_mut();
        let mut offset = 0;
        for share in self.shares() {
            let length = share.buffer_length();
            share.to_bytes(&mut &mut buffer[offset..offset + length]);
            offset += length;
        }
    }
}

impl FromBytes for ShareBundle {
    fn from_byte_slice<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        let mut offset = 0;
        let mut index = None;
        let mut values = Vec::new();
        while offset < bytes.len() {
            let reader = ShareBuffer::new(&bytes[offset..])
                .with_context(|| format!("invalid share at offset {}", offset))?;
            let length = reader.len();
            let share = Share::from_byte_slice(&&bytes[offset..offset + length])?;
            match index {
                None => index = Some(share.index),
                Some(index) if index != share.index => {
                    return Err(anyhow!(
                        "the bundle mixes shares of participants {} and {}",
                        index,
                        share.index
                    ));
                }
                Some(_) => {}
            }
            values.push(share.value);
            offset += length;
        }
        let index = index.ok_or_else(|| anyhow!("the bundle holds no shares"))?;
        Ok(ShareBundle::new(index, values))
    }
}
