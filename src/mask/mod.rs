//! Masking, aggregation and unmasking of model updates.
//!
//! # Masking group
//! A model update is a byte payload which is read as big endian 32 bit integers, padding a
//! trailing partial group with zeros. The integers are masked in the group of integers modulo the
//! mask range, usually `2^32`, which is unrelated to the field used for secret sharing. The masked
//! payload has the same length as the raw update.
//!
//! # Masks
//! Every participant adds two kinds of masks to its update:
//! - A **pairwise mask** for every peer, derived from the `X25519` shared secret of the pair with
//!   [`pairwise_mask()`]. The participant with the higher index adds the mask, the other one
//!   subtracts it, hence the pairwise masks cancel out in the sum.
//! - A **self mask**, derived from the private [`SelfSeed`] of the participant with the counter
//!   mode generator [`prg()`]. The self masks don't cancel out. The seed is shared among all
//!   participants, and the server recovers it from the revealed shares to remove the self mask
//!   from the sum.
//!
//! ```
//! # use secagg_client::{crypto::ByteObject, mask::{Aggregation, ModVector, SelfSeed}};
//! let seed = SelfSeed::generate();
//! let mut masked = ModVector::from_bytes(&[0, 0, 0, 42], 1 << 32).unwrap();
//! masked.add_mask(&seed.derive_mask(masked.len(), 1 << 32)).unwrap();
//!
//! let mut aggregation = Aggregation::new(1 << 32, 4).unwrap();
//! aggregation.aggregate(&masked.to_bytes(4)).unwrap();
//! aggregation.remove_self_mask(&seed).unwrap();
//! assert_eq!(aggregation.into_bytes(), vec![0, 0, 0, 42]);
//! ```
//!
//! # Quantization
//! Float updates are clipped to `[-clipping_range, clipping_range]` and quantized to integers in
//! `[0, target_range]` with [`quantize()`] before they are masked. The rounding is stochastic and
//! thus unbiased. The server maps the unmasked sum back to floats with [`dequantize_sum()`].

pub(crate) mod aggregation;
pub(crate) mod pairwise;
pub(crate) mod prg;
pub(crate) mod quantize;
pub(crate) mod seed;
pub(crate) mod vector;

pub use self::{
    aggregation::{Aggregation, AggregationError},
    pairwise::{pairwise_mask, PAIRWISE_MASK_INFO},
    prg::prg,
    quantize::{dequantize, dequantize_sum, quantize, quantize_with_rng},
    seed::{SeedRecoveryError, SelfSeed, SEED_LIMB_BYTES},
    vector::{
        decode_elements,
        encode_elements,
        InvalidModRangeError,
        LengthMismatchError,
        ModVector,
        ELEMENT_BYTES,
    },
};
