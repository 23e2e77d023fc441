//! Counter mode pseudorandom generation of masks.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use zeroize::Zeroizing;

use crate::crypto::Sha256;

/// Generates `len` pseudorandom integers in `[0, mod_range)` from the `seed`.
///
/// The integer at position `counter` is the leading four bytes, read as a big endian integer, of
/// `SHA256(seed || counter)`, where the counter is encoded as four big endian bytes, reduced modulo
/// `mod_range`. The output only depends on the inputs, hence every party which knows the seed
/// derives the same mask. A zero `mod_range` yields zeros. The copy of the seed is zeroed after
/// use.
pub fn prg(seed: &[u8], mod_range: u64, len: usize) -> Vec<u32> {
    let mut input = Zeroizing::new(Vec::with_capacity(seed.len() + 4));
    input.extend_from_slice(seed);
    input.extend_from_slice(&[0_u8; 4]);
    let offset = seed.len();

    (0..len)
        .map(|counter| {
            input[offset..].copy_from_slice(&(counter as u32).to_be_bytes());
            let word = u64::from(Sha256::hash(&input).leading_u32());
            // the reduced word is smaller than 2^32
            word.checked_rem(mod_range).unwrap_or(0) as u32
        })
        .collect()
}
