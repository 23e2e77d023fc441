//! Splitting and reconstruction of secrets.
//!
//! See the [sharing module] documentation since this is a private module anyways.
//!
//! [sharing module]: crate::sharing

use std::collections::HashSet;

use num::bigint::BigUint;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    crypto::generate_integer,
    sharing::{
        bundle::ShareBundle,
        field::{field_prime, FieldElement},
    },
    ParticipantIndex,
};

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors related to the splitting and reconstruction of secrets.
pub enum SharingError {
    #[error("invalid sharing parameters: {0}")]
    InvalidParameters(&'static str),

    #[error("at least two shares are required for reconstruction, got {0}")]
    InsufficientShares(usize),

    #[error("share index {0} occurs more than once")]
    DuplicateIndex(ParticipantIndex),

    #[error("share index {0} is not a valid participant index")]
    InvalidIndex(ParticipantIndex),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// A share of a secret: the evaluation of the sharing polynomial at `x = index`.
pub struct Share {
    /// The 1-based index of the participant holding the share.
    pub index: ParticipantIndex,
    /// The value of the sharing polynomial at `index`.
    pub value: FieldElement,
}

fn check_parameters(threshold: u32, total_shares: u32) -> Result<(), SharingError> {
    if threshold == 0 {
        return Err(SharingError::InvalidParameters("the threshold must be positive"));
    }
    if threshold > total_shares {
        return Err(SharingError::InvalidParameters(
            "the threshold exceeds the number of shares",
        ));
    }
    Ok(())
}

/// Splits the `secret` into `total_shares` shares, any `threshold` of which reconstruct it.
///
/// The coefficients of the sharing polynomial are drawn from a `ChaCha20` PRNG seeded from the
/// system entropy.
///
/// # Errors
/// Fails if the parameters don't satisfy `1 <= threshold <= total_shares` or if the `secret` is
/// not an element of the field.
pub fn split(
    secret: &BigUint,
    threshold: u32,
    total_shares: u32,
) -> Result<Vec<Share>, SharingError> {
    let mut prng = ChaCha20Rng::from_entropy();
    split_with_rng(&mut prng, secret, threshold, total_shares)
}

/// Splits the `secret` like [`split()`], with the coefficients drawn from the given `prng`.
///
/// # Errors
/// Fails for the same reasons as [`split()`].
pub fn split_with_rng<R: RngCore + ?Sized>(
    prng: &mut R,
    secret: &BigUint,
    threshold: u32,
    total_shares: u32,
) -> Result<Vec<Share>, SharingError> {
    check_parameters(threshold, total_shares)?;
    let secret = FieldElement::new(secret.clone()).ok_or(SharingError::InvalidParameters(
        "the secret is not an element of the field",
    ))?;

    let prime = field_prime();
    // coefficients[0] is the secret, coefficients[k] belongs to x^k
    let mut coefficients = Vec::with_capacity(threshold as usize);
    coefficients.push(secret);
    coefficients.extend(
        (1..threshold).map(|_| FieldElement::reduce(generate_integer(prng, &prime))),
    );

    let shares = (1..=total_shares)
        .map(|index| {
            let x = FieldElement::from(u64::from(index));
            let value = coefficients
                .iter()
                .rev()
                .fold(FieldElement::zero(), |acc, coefficient| {
                    &(&acc * &x) + coefficient
                });
            Share { index, value }
        })
        .collect();
    Ok(shares)
}

/// Reconstructs a secret from its shares by Lagrange interpolation at `x = 0`.
///
/// Any number of shares of at least two is interpolated. If fewer shares than the threshold of
/// the sharing are given, the result is a meaningless element of the field.
///
/// # Errors
/// Fails if fewer than two shares are given or if the share indices are zero or not distinct.
pub fn reconstruct(shares: &[Share]) -> Result<BigUint, SharingError> {
    if shares.len() < 2 {
        return Err(SharingError::InsufficientShares(shares.len()));
    }
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if share.index == 0 {
            return Err(SharingError::InvalidIndex(share.index));
        }
        if !seen.insert(share.index) {
            return Err(SharingError::DuplicateIndex(share.index));
        }
    }

    let xs = shares
        .iter()
        .map(|share| FieldElement::from(u64::from(share.index)))
        .collect::<Vec<_>>();
    let mut secret = FieldElement::zero();
    for (i, share) in shares.iter().enumerate() {
        // l_i(0) = prod_{j != i} x_j / (x_j - x_i)
        let mut numerator = FieldElement::one();
        let mut denominator = FieldElement::one();
        for (j, x_j) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = &numerator * x_j;
            denominator = &denominator * &(x_j - &xs[i]);
        }
        // safe unwrap: the indices are distinct, hence the denominator is non-zero
        let basis = &numerator * &denominator.inverse().unwrap();
        secret = &secret + &(&share.value * &basis);
    }
    Ok(secret.into())
}

/// Splits several secrets at once and bundles the shares per participant.
///
/// The bundle of participant `i` holds the `i`-th share of every secret, in the order of the
/// `secrets`.
///
/// # Errors
/// Fails for the same reasons as [`split()`].
pub fn split_multiple(
    secrets: &[BigUint],
    threshold: u32,
    total_shares: u32,
) -> Result<Vec<ShareBundle>, SharingError> {
    let mut prng = ChaCha20Rng::from_entropy();
    split_multiple_with_rng(&mut prng, secrets, threshold, total_shares)
}

/// Splits several secrets like [`split_multiple()`], with the coefficients drawn from the given
/// `prng`.
///
/// # Errors
/// Fails for the same reasons as [`split()`].
pub fn split_multiple_with_rng<R: RngCore + ?Sized>(
    prng: &mut R,
    secrets: &[BigUint],
    threshold: u32,
    total_shares: u32,
) -> Result<Vec<ShareBundle>, SharingError> {
    check_parameters(threshold, total_shares)?;
    let mut bundles = (1..=total_shares)
        .map(|index| ShareBundle::new(index, Vec::with_capacity(secrets.len())))
        .collect::<Vec<_>>();
    for secret in secrets {
        let shares = split_with_rng(prng, secret, threshold, total_shares)?;
        for (bundle, share) in bundles.iter_mut().zip(shares) {
            bundle.values.push(share.value);
        }
    }
    Ok(bundles)
}

/// Reconstructs several secrets at once from the bundles of at least two participants.
///
/// # Errors
/// Fails if the bundles hold different numbers of shares or for the same reasons as
/// [`reconstruct()`].
pub fn reconstruct_multiple(bundles: &[ShareBundle]) -> Result<Vec<BigUint>, SharingError> {
    if bundles.len() < 2 {
        return Err(SharingError::InsufficientShares(bundles.len()));
    }
    let count = bundles[0].values.len();
    if bundles.iter().any(|bundle| bundle.values.len() != count) {
        return Err(SharingError::InvalidParameters(
            "the bundles hold different numbers of shares",
        ));
    }
    (0..count)
        .map(|k| {
            let shares = bundles
                .iter()
                .map(|bundle| Share {
                    index: bundle.index,
                    value: bundle.values[k].clone(),
                })
                .collect::<Vec<_>>();
            reconstruct(&shares)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use num::traits::One;

    use super::*;

    fn pick(shares: &[Share], indices: &[u32]) -> Vec<Share> {
        indices
            .iter()
            .map(|index| shares[*index as usize - 1].clone())
            .collect()
    }

    #[test]
    fn test_two_of_three() {
        let secret = BigUint::from(1234567_u32);
        let shares = split(&secret, 2, 3).unwrap();
        assert_eq!(shares.len(), 3);
        assert_eq!(
            shares.iter().map(|share| share.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(reconstruct(&pick(&shares, &[1, 3])).unwrap(), secret);
        assert_eq!(reconstruct(&pick(&shares, &[2, 3])).unwrap(), secret);
        assert_eq!(reconstruct(&pick(&shares, &[3, 1])).unwrap(), secret);
        assert_eq!(reconstruct(&shares).unwrap(), secret);
    }

    /// Generate tests which split a secret and reconstruct it from every window of `threshold`
    /// consecutive shares (wrapping around).
    ///
    /// The arguments to the macro are:
    /// - a suffix for the test name
    /// - the threshold
    /// - the number of shares
    macro_rules! test_sharing {
        ($suffix:ident, $threshold:expr, $total:expr $(,)?) => {
            paste::item! {
                #[test]
                fn [<test_sharing_ $suffix>]() {
                    let mut prng = ChaCha20Rng::from_seed([$threshold as u8; 32]);
                    let secret = generate_integer(&mut prng, &field_prime());
                    let shares = split_with_rng(&mut prng, &secret, $threshold, $total).unwrap();
                    assert_eq!(shares.len(), $total as usize);
                    for start in 0..$total as usize {
                        let window = (0..$threshold as usize)
                            .map(|offset| shares[(start + offset) % $total as usize].clone())
                            .collect::<Vec<_>>();
                        if window.len() >= 2 {
                            assert_eq!(reconstruct(&window).unwrap(), secret);
                        }
                    }
                }
            }
        };
    }

    test_sharing!(t2_n2, 2, 2);
    test_sharing!(t2_n5, 2, 5);
    test_sharing!(t3_n5, 3, 5);
    test_sharing!(t5_n5, 5, 5);
    test_sharing!(t7_n20, 7, 20);

    #[test]
    fn test_threshold_one() {
        // a constant polynomial: every share is the secret itself
        let secret = BigUint::from(42_u8);
        let shares = split(&secret, 1, 4).unwrap();
        assert!(shares.iter().all(|share| share.value == FieldElement::from(42)));
        assert_eq!(reconstruct(&pick(&shares, &[2, 4])).unwrap(), secret);
    }

    #[test]
    fn test_extreme_secrets() {
        let max = field_prime() - BigUint::one();
        for secret in &[BigUint::from(0_u8), max] {
            let shares = split(secret, 3, 4).unwrap();
            assert_eq!(&reconstruct(&pick(&shares, &[1, 2, 4])).unwrap(), secret);
        }
    }

    #[test]
    fn test_below_threshold_is_meaningless() {
        let secret = BigUint::from(1234567_u32);
        let shares = split(&secret, 3, 5).unwrap();
        // succeeds mechanically, but the value is unrelated to the secret
        let guess = reconstruct(&pick(&shares, &[1, 2])).unwrap();
        assert!(guess < field_prime());
        assert_ne!(guess, secret);
    }

    #[test]
    fn test_invalid_parameters() {
        let secret = BigUint::from(1_u8);
        assert!(matches!(
            split(&secret, 0, 3),
            Err(SharingError::InvalidParameters(_))
        ));
        assert!(matches!(
            split(&secret, 4, 3),
            Err(SharingError::InvalidParameters(_))
        ));
        assert!(matches!(
            split(&field_prime(), 2, 3),
            Err(SharingError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_invalid_reconstruction() {
        let shares = split(&BigUint::from(7_u8), 2, 3).unwrap();
        assert_eq!(
            reconstruct(&pick(&shares, &[1])),
            Err(SharingError::InsufficientShares(1))
        );
        assert_eq!(reconstruct(&[]), Err(SharingError::InsufficientShares(0)));
        assert_eq!(
            reconstruct(&pick(&shares, &[2, 2])),
            Err(SharingError::DuplicateIndex(2))
        );
        let zero = Share {
            index: 0,
            value: FieldElement::zero(),
        };
        assert_eq!(
            reconstruct(&[zero, shares[0].clone()]),
            Err(SharingError::InvalidIndex(0))
        );
    }

    #[test]
    fn test_multiple() {
        let secrets = vec![
            BigUint::from(1_u8),
            BigUint::from(u64::MAX),
            field_prime() - BigUint::one(),
        ];
        let bundles = split_multiple(&secrets, 3, 5).unwrap();
        assert_eq!(bundles.len(), 5);
        for (i, bundle) in bundles.iter().enumerate() {
            assert_eq!(bundle.index as usize, i + 1);
            assert_eq!(bundle.values.len(), secrets.len());
        }

        let picked = vec![bundles[4].clone(), bundles[0].clone(), bundles[2].clone()];
        assert_eq!(reconstruct_multiple(&picked).unwrap(), secrets);

        let mut uneven = picked;
        uneven[1].values.pop();
        assert!(matches!(
            reconstruct_multiple(&uneven),
            Err(SharingError::InvalidParameters(_))
        ));
        assert_eq!(
            reconstruct_multiple(&bundles[..1]),
            Err(SharingError::InsufficientShares(1))
        );
    }
}
