//! Arithmetic in the prime field of order `2^127 - 1`.
//!
//! See the [sharing module] documentation since this is a private module anyways.
//!
//! [sharing module]: crate::sharing

use std::ops::{Add, Mul, Sub};

use derive_more::{Display, Into};
use num::{
    bigint::BigUint,
    traits::{One, Zero},
};
use serde::{Deserialize, Serialize};

/// The exponent of the Mersenne prime which is the order of the field.
pub const FIELD_PRIME_EXPONENT: usize = 127;

/// The number of bytes of a serialized field element.
pub const FIELD_ELEMENT_BYTES: usize = 16;

/// Gets the order of the field, the Mersenne prime `2^127 - 1`.
pub fn field_prime() -> BigUint {
    (BigUint::one() << FIELD_PRIME_EXPONENT) - BigUint::one()
}

#[derive(Clone, Debug, Display, Into, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// An element of the prime field of order `2^127 - 1`.
pub struct FieldElement(BigUint);

impl FieldElement {
    /// Creates a field element from its canonical representative.
    ///
    /// Returns `None` if `value` is not smaller than the field order.
    pub fn new(value: BigUint) -> Option<Self> {
        if value < field_prime() {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a field element from any integer by reducing it modulo the field order.
    pub fn reduce(value: BigUint) -> Self {
        Self(value % field_prime())
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn one() -> Self {
        Self(BigUint::one())
    }

    /// Gets the canonical representative in `[0, 2^127 - 1)`.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Computes the multiplicative inverse as `self^(p - 2)`.
    ///
    /// Returns `None` for zero, which has no inverse.
    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        let prime = field_prime();
        let exponent = &prime - BigUint::from(2_u8);
        Some(Self(self.0.modpow(&exponent, &prime)))
    }

    /// Serializes the element as 16 big endian bytes.
    ///
    /// Canonical elements always fit. Larger integers would be truncated to their lowest 16
    /// bytes, which is the behavior expected by the share wire format.
    pub fn to_be_bytes(&self) -> [u8; FIELD_ELEMENT_BYTES] {
        let bytes = self.0.to_bytes_be();
        let mut padded = [0_u8; FIELD_ELEMENT_BYTES];
        if bytes.len() >= FIELD_ELEMENT_BYTES {
            padded.copy_from_slice(&bytes[bytes.len() - FIELD_ELEMENT_BYTES..]);
        } else {
            padded[FIELD_ELEMENT_BYTES - bytes.len()..].copy_from_slice(&bytes);
        }
        padded
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        // u64 values are always canonical
        Self(BigUint::from(value))
    }
}

impl<'a, 'b> Add<&'b FieldElement> for &'a FieldElement {
    type Output = FieldElement;

    fn add(self, rhs: &'b FieldElement) -> FieldElement {
        FieldElement((&self.0 + &rhs.0) % field_prime())
    }
}

impl<'a, 'b> Sub<&'b FieldElement> for &'a FieldElement {
    type Output = FieldElement;

    fn sub(self, rhs: &'b FieldElement) -> FieldElement {
        let prime = field_prime();
        FieldElement((&self.0 + &prime - &rhs.0) % prime)
    }
}

impl<'a, 'b> Mul<&'b FieldElement> for &'a FieldElement {
    type Output = FieldElement;

    fn mul(self, rhs: &'b FieldElement) -> FieldElement {
        FieldElement((&self.0 * &rhs.0) % field_prime())
    }
}
