//! PRNG utilities for the crypto primitives.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [crypto module]: crate::crypto

use num::{bigint::BigUint, traits::identities::Zero};
use rand::RngCore;

/// Generates a secure pseudo-random integer.
///
/// Draws from a uniform distribution over the integers between zero (included) and
/// `max_int` (excluded) by rejection sampling. The sampler is only as secure as the given `prng`,
/// which should be a cryptographically secure generator such as `ChaCha20`.
pub fn generate_integer<R: RngCore + ?Sized>(prng: &mut R, max_int: &BigUint) -> BigUint {
    if max_int.is_zero() {
        return BigUint::zero();
    }
    let bits = max_int.bits();
    let mut bytes = vec![0_u8; ((bits + 7) / 8) as usize];
    // clear the excess high bits so that at least every second draw is accepted
    let excess = (bytes.len() as u64 * 8 - bits) as u32;
    let mut rand_int = max_int.clone();
    while &rand_int >= max_int {
        prng.fill_bytes(&mut bytes);
        bytes[0] &= 0xff_u8 >> excess;
        rand_int = BigUint::from_bytes_be(&bytes);
    }
    rand_int
}
