//! Shamir secret sharing over the prime field of order `2^127 - 1`.
//!
//! # Field
//! All arithmetic happens modulo the Mersenne prime `p = 2^127 - 1`. A [`FieldElement`] is the
//! canonical representative of a residue class, i.e. an integer in `[0, p)`.
//!
//! # Splitting and reconstruction
//! A secret is the constant term of a random polynomial of degree `threshold - 1`. The share of
//! the participant with the 1-based index `i` is the evaluation of the polynomial at `x = i`. Any
//! `threshold` shares determine the polynomial and hence the secret, which is recovered by
//! Lagrange interpolation at `x = 0`.
//!
//! ```
//! # use num::bigint::BigUint;
//! # use secagg_client::sharing::{reconstruct, split};
//! let secret = BigUint::from(1234567_u32);
//! let shares = split(&secret, 2, 3).unwrap();
//! let recovered = reconstruct(&[shares[0].clone(), shares[2].clone()]).unwrap();
//! assert_eq!(recovered, secret);
//! ```
//!
//! Several secrets can be shared at once, in which case the shares of one participant are
//! collected in a [`ShareBundle`].
//!
//! # Serialization
//! Shares travel between devices, hence their byte layout is fixed. A share is serialized as its
//! 4 bytes big endian index, its 16 bytes big endian value, the 4 bytes big endian length of the
//! modulus and the big endian bytes of the modulus. A bundle is the concatenation of its shares.
//! Encrypted bundles are exchanged as an [`EncryptedShare`].

pub(crate) mod bundle;
pub(crate) mod field;
pub(crate) mod serialization;
pub(crate) mod shamir;

pub use self::{
    bundle::{EncryptedShare, ShareBundle, ShareDecryptionError},
    field::{field_prime, FieldElement, FIELD_ELEMENT_BYTES, FIELD_PRIME_EXPONENT},
    serialization::{DecodeError, FromBytes, ShareBuffer, ToBytes, SHARE_HEADER_LENGTH},
    shamir::{
        reconstruct,
        reconstruct_multiple,
        split,
        split_multiple,
        split_multiple_with_rng,
        split_with_rng,
        Share,
        SharingError,
    },
};
