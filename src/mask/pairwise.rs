//! Pairwise masks derived from the shared secrets of two peers.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use crate::{crypto::SharedSecret, mask::prg::prg};

/// The `HKDF` info label of the pairwise masks, followed by the round context.
pub const PAIRWISE_MASK_INFO: &[u8] = b"secagg/pairwise-mask";

/// Derives the pairwise mask of `len` integers in `[0, mod_range)` from the shared `secret` of
/// two peers.
///
/// The seed of the mask is `HKDF-SHA256` of the secret with the info label
/// [`PAIRWISE_MASK_INFO`]` || context`, which drives the same counter mode generator as the self
/// masks. Both peers of a pair derive the same mask, while the `context` binds it to one round.
pub fn pairwise_mask(secret: &SharedSecret, context: &[u8], mod_range: u64, len: usize) -> Vec<u32> {
    let mut info = Vec::with_capacity(PAIRWISE_MASK_INFO.len() + context.len());
    info.extend_from_slice(PAIRWISE_MASK_INFO);
    info.extend_from_slice(context);
    let seed = secret.derive(&info);
    prg(&seed[..], mod_range, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ExchangeKeyPair;

    #[test]
    fn test_symmetry() {
        let alice = ExchangeKeyPair::generate();
        let bob = ExchangeKeyPair::generate();
        let alice_secret = alice.secret.agree(&bob.public).unwrap();
        let bob_secret = bob.secret.agree(&alice.public).unwrap();
        assert_eq!(
            pairwise_mask(&alice_secret, b"round", 1 << 32, 16),
            pairwise_mask(&bob_secret, b"round", 1 << 32, 16),
        );
    }

    #[test]
    fn test_context_separation() {
        let alice = ExchangeKeyPair::generate();
        let bob = ExchangeKeyPair::generate();
        let secret = alice.secret.agree(&bob.public).unwrap();
        assert_ne!(
            pairwise_mask(&secret, b"round 1", 1 << 32, 16),
            pairwise_mask(&secret, b"round 2", 1 << 32, 16),
        );
        assert!(pairwise_mask(&secret, b"round", 100, 64)
            .iter()
            .all(|value| *value < 100));
    }
}
