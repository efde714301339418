//! Shamir Secret Sharing over the prime field of [`crate::field`].
//!
//! - Secret is an arbitrary byte string read as a big-endian integer `< P`.
//! - Polynomial coefficients beyond the constant term are 128-bit random integers.
//! - Share x values are distinct, non-zero 100-bit random integers.
//! - Threshold K ∈ [2, 255], total shares N ∈ [K, 255].

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand_core::{CryptoRng, OsRng, RngCore};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::field;

/// Bit width of the random (non-constant) polynomial coefficients.
pub const COEFF_BITS: u64 = 128;

/// Bit width of share x values.
pub const X_BITS: u64 = 100;

/// Reconstructed encodings longer than this may carry one sign-padding zero.
const NORMALIZE_WIDTH: usize = 32;

/// How split-time arithmetic treats coefficients and evaluations.
///
/// Reconstruction always works modulo `P`; both variants recover the same
/// secret as long as it is smaller than `P`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reduction {
    /// Every Horner step is reduced mod `P`; published y values are `< P`.
    #[default]
    Modular,
    /// Plain integer evaluation with no reduction, as older share files were
    /// written. y values grow to roughly `128 + 100·(K−1)` bits.
    Integer,
}

/// One share: evaluation point and polynomial value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: BigUint,
    pub y: BigUint,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A complete set of `total` shares with threshold `threshold`.
#[derive(Clone, Debug)]
pub struct ShareSet {
    pub points: Vec<Point>,
    pub total: u8,
    pub threshold: u8,
}

/// Secret-sharing polynomial; `coefficients()[0]` is the secret.
pub struct Polynomial {
    coeffs: Vec<BigUint>,
    reduction: Reduction,
}

impl Polynomial {
    /// Build a random degree-(threshold − 1) polynomial with `secret` as
    /// its constant term.
    pub fn random(secret: &[u8], threshold: u8, reduction: Reduction) -> Result<Self> {
        Self::random_with_rng(secret, threshold, reduction, &mut OsRng)
    }

    fn random_with_rng<R: RngCore + CryptoRng>(
        secret: &[u8],
        threshold: u8,
        reduction: Reduction,
        rng: &mut R,
    ) -> Result<Self> {
        if threshold < 2 {
            return Err(Error::InvalidThreshold {
                threshold: threshold as usize,
                total: 0,
            });
        }

        let constant = BigUint::from_bytes_be(secret);
        if &constant >= field::modulus() {
            return Err(Error::SecretOutOfRange);
        }

        let mut coeffs = Vec::with_capacity(threshold as usize);
        coeffs.push(constant);
        for _ in 1..threshold {
            coeffs.push(rng.gen_biguint(COEFF_BITS));
        }
        Ok(Self { coeffs, reduction })
    }

    /// Wrap explicit coefficients (lowest degree first).
    pub fn from_coefficients(coeffs: Vec<BigUint>, reduction: Reduction) -> Self {
        Self { coeffs, reduction }
    }

    pub fn coefficients(&self) -> &[BigUint] {
        &self.coeffs
    }

    pub fn evaluate(&self, x: &BigUint) -> BigUint {
        match self.reduction {
            Reduction::Modular => eval_horner_mod(&self.coeffs, x),
            Reduction::Integer => eval_horner(&self.coeffs, x),
        }
    }
}

impl Drop for Polynomial {
    fn drop(&mut self) {
        for c in &mut self.coeffs {
            c.set_zero();
        }
    }
}

/// Evaluate a polynomial over the integers using Horner's method.
///
/// `coeffs` is lowest degree first.
pub fn eval_horner(coeffs: &[BigUint], x: &BigUint) -> BigUint {
    coeffs
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, c| acc * x + c)
}

/// Horner's method with a reduction mod `P` after every step.
pub fn eval_horner_mod(coeffs: &[BigUint], x: &BigUint) -> BigUint {
    coeffs
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, c| field::add(&field::mul(&acc, x), c))
}

/// Evaluate `poly` at `n` distinct random non-zero x values.
pub fn generate_points(n: u8, poly: &Polynomial) -> Vec<Point> {
    let mut rng = OsRng;
    distinct_xs(n as usize, || rng.gen_biguint(X_BITS))
        .into_iter()
        .map(|x| {
            let y = poly.evaluate(&x);
            Point { x, y }
        })
        .collect()
}

/// Draw from `sample` until `n` distinct non-zero values are collected.
///
/// Duplicates and zero are resampled; order of first appearance is kept.
fn distinct_xs(n: usize, mut sample: impl FnMut() -> BigUint) -> Vec<BigUint> {
    let mut seen = HashSet::with_capacity(n);
    let mut xs = Vec::with_capacity(n);
    while xs.len() < n {
        let x = sample();
        if x.is_zero() || !seen.insert(x.clone()) {
            continue;
        }
        xs.push(x);
    }
    xs
}

/// Split `secret` into `total` shares, any `threshold` of which recover it.
pub fn split_secret(
    secret: &[u8],
    total: u8,
    threshold: u8,
    reduction: Reduction,
) -> Result<ShareSet> {
    validate_threshold(threshold, total)?;

    let poly = Polynomial::random(secret, threshold, reduction)?;
    let points = generate_points(total, &poly);
    debug!(total, threshold, ?reduction, "split secret");

    Ok(ShareSet {
        points,
        total,
        threshold,
    })
}

pub fn validate_threshold(threshold: u8, total: u8) -> Result<()> {
    if threshold < 2 || total < threshold {
        return Err(Error::InvalidThreshold {
            threshold: threshold as usize,
            total: total as usize,
        });
    }
    Ok(())
}

/// Reconstruct the secret from at least `threshold` points via Lagrange
/// interpolation at x = 0.
///
/// Every supplied point takes part in the sum, not just the first
/// `threshold`. Consistent extra points do not change the result; a
/// corrupted one does. Duplicate x values fail with [`Error::NoInverse`].
pub fn reconstruct_secret(points: &[Point], threshold: u8) -> Result<Zeroizing<Vec<u8>>> {
    if threshold < 2 {
        return Err(Error::InvalidThreshold {
            threshold: threshold as usize,
            total: points.len(),
        });
    }
    if points.len() < threshold as usize {
        return Err(Error::InsufficientShares {
            threshold: threshold as usize,
            available: points.len(),
        });
    }

    let mut secret = BigUint::zero();
    for (i, point) in points.iter().enumerate() {
        let li = lagrange_at_zero(points, i)?;
        secret = field::add(&secret, &field::mul(&point.y, &li));
    }
    debug!(points = points.len(), threshold, "reconstructed secret");

    let encoded = Zeroizing::new(BigInt::from(secret).to_signed_bytes_be());
    Ok(Zeroizing::new(normalize(&encoded)))
}

/// Lagrange basis polynomial `L_i` evaluated at 0:
/// `Π_{j≠i} (−x_j) · (x_i − x_j)^(−1) mod P`.
fn lagrange_at_zero(points: &[Point], i: usize) -> Result<BigUint> {
    let xi = &points[i].x;
    let mut li = BigUint::one();
    for (j, pj) in points.iter().enumerate() {
        if i == j {
            continue;
        }
        let num = field::neg(&pj.x);
        let den = field::inv(&field::sub(xi, &pj.x))?;
        li = field::mul(&field::mul(&li, &num), &den);
    }
    Ok(li)
}

/// Strip one sign-padding zero from a two's-complement encoding longer
/// than 32 bytes.
///
/// Only a single leading zero is removed, and only past 32 bytes: a short
/// secret whose top bit is set keeps its padding byte, and a secret that
/// began with zero bytes comes back without them. The integer value is
/// unchanged either way.
pub fn normalize(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() > NORMALIZE_WIDTH && bytes[0] == 0 {
        bytes[1..].to_vec()
    } else {
        bytes.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn value(bytes: &[u8]) -> BigUint {
        BigUint::from_bytes_be(bytes)
    }

    fn random_secret(len: usize) -> Vec<u8> {
        let mut secret = vec![0u8; len];
        OsRng.fill_bytes(&mut secret);
        secret
    }

    #[test]
    fn horner_evaluates_known_polynomial() {
        let coeffs = vec![big(1), big(2), big(3)];
        assert_eq!(eval_horner(&coeffs, &big(2)), big(17));
        assert_eq!(eval_horner_mod(&coeffs, &big(2)), big(17));
    }

    #[test]
    fn horner_mod_matches_reduced_integer_evaluation() {
        let coeffs = vec![
            field::modulus() - 1u32,
            OsRng.gen_biguint(COEFF_BITS),
            OsRng.gen_biguint(COEFF_BITS),
            OsRng.gen_biguint(COEFF_BITS),
        ];
        let x = OsRng.gen_biguint(X_BITS);
        assert_eq!(
            eval_horner_mod(&coeffs, &x),
            field::reduce(&eval_horner(&coeffs, &x))
        );
    }

    #[test]
    fn polynomial_has_threshold_coefficients() {
        let poly = Polynomial::random(&[1, 2, 3, 4, 5], 3, Reduction::Integer).unwrap();
        assert_eq!(poly.coefficients().len(), 3);
        assert_eq!(poly.coefficients()[0], value(&[1, 2, 3, 4, 5]));
        assert!(poly.coefficients()[1..].iter().all(|c| c.bits() <= COEFF_BITS));
    }

    #[test]
    fn generate_points_yields_requested_count() {
        let poly = Polynomial::from_coefficients(vec![big(1), big(2), big(3)], Reduction::Integer);
        let points = generate_points(3, &poly);
        assert_eq!(points.len(), 3);
        for p in &points {
            assert_eq!(p.y, eval_horner(&[big(1), big(2), big(3)], &p.x));
        }
    }

    #[test]
    fn distinct_xs_skips_zero_and_duplicates() {
        let mut draws = vec![5u64, 0, 5, 7, 7, 0, 9, 11].into_iter();
        let xs = distinct_xs(3, || big(draws.next().unwrap()));
        assert_eq!(xs, vec![big(5), big(7), big(9)]);
    }

    #[test]
    fn generated_x_values_are_distinct() {
        let secret = random_secret(32);
        let set = split_secret(&secret, 255, 2, Reduction::Modular).unwrap();
        assert_eq!(set.points.len(), 255);
        let xs: HashSet<&BigUint> = set.points.iter().map(|p| &p.x).collect();
        assert_eq!(xs.len(), 255);
        assert!(set.points.iter().all(|p| !p.x.is_zero() && p.x.bits() <= X_BITS));
    }

    #[test]
    fn roundtrip_all_secret_lengths_both_reductions() {
        for reduction in [Reduction::Modular, Reduction::Integer] {
            for len in 1..=32 {
                let secret = random_secret(len);
                let set = split_secret(&secret, 5, 3, reduction).unwrap();
                let recovered = reconstruct_secret(&set.points[..3], 3).unwrap();
                assert_eq!(
                    value(&recovered),
                    value(&secret),
                    "len={len} reduction={reduction:?}"
                );
            }
        }
    }

    #[test]
    fn full_width_secret_with_top_bit_roundtrips_exactly() {
        let mut secret = random_secret(32);
        secret[0] |= 0x80;
        for reduction in [Reduction::Modular, Reduction::Integer] {
            let set = split_secret(&secret, 4, 2, reduction).unwrap();
            let recovered = reconstruct_secret(&set.points[1..3], 2).unwrap();
            assert_eq!(recovered.as_slice(), secret.as_slice());
        }
    }

    #[test]
    fn every_subset_reconstructs_same_secret() {
        let secret = random_secret(32);
        let set = split_secret(&secret, 5, 3, Reduction::Modular).unwrap();
        let expected = value(&secret);

        for a in 0..5 {
            for b in (a + 1)..5 {
                for c in (b + 1)..5 {
                    let subset = vec![
                        set.points[a].clone(),
                        set.points[b].clone(),
                        set.points[c].clone(),
                    ];
                    let recovered = reconstruct_secret(&subset, 3).unwrap();
                    assert_eq!(value(&recovered), expected, "subset {a},{b},{c}");
                }
            }
        }
    }

    #[test]
    fn more_points_than_threshold_still_reconstruct() {
        let secret = random_secret(20);
        for reduction in [Reduction::Modular, Reduction::Integer] {
            let set = split_secret(&secret, 7, 4, reduction).unwrap();
            let from_all = reconstruct_secret(&set.points, 4).unwrap();
            let from_five = reconstruct_secret(&set.points[2..], 4).unwrap();
            assert_eq!(value(&from_all), value(&secret));
            assert_eq!(from_all, from_five);
        }
    }

    #[test]
    fn too_few_shares_fails() {
        let secret = random_secret(32);
        let set = split_secret(&secret, 5, 3, Reduction::Modular).unwrap();
        let err = reconstruct_secret(&set.points[..2], 3).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientShares {
                threshold: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn duplicate_x_rejected() {
        let secret = random_secret(16);
        let set = split_secret(&secret, 3, 2, Reduction::Modular).unwrap();
        let dupes = vec![set.points[0].clone(), set.points[0].clone()];
        assert!(matches!(
            reconstruct_secret(&dupes, 2),
            Err(Error::NoInverse(_))
        ));
    }

    #[test]
    fn wrong_share_produces_wrong_secret() {
        let secret = random_secret(32);
        let set = split_secret(&secret, 5, 3, Reduction::Modular).unwrap();
        let mut bad = set.points[2].clone();
        bad.y += 1u32;
        let subset = vec![set.points[0].clone(), set.points[1].clone(), bad];
        let recovered = reconstruct_secret(&subset, 3).unwrap();
        assert_ne!(value(&recovered), value(&secret));
    }

    #[test]
    fn invalid_thresholds_rejected() {
        let secret = [1u8; 32];
        assert!(matches!(
            split_secret(&secret, 3, 1, Reduction::Modular),
            Err(Error::InvalidThreshold { .. })
        ));
        assert!(matches!(
            split_secret(&secret, 3, 5, Reduction::Modular),
            Err(Error::InvalidThreshold { .. })
        ));
        assert!(matches!(
            reconstruct_secret(&[], 1),
            Err(Error::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn secret_at_or_above_modulus_rejected() {
        let too_big = [0xffu8; 33];
        assert!(matches!(
            split_secret(&too_big, 3, 2, Reduction::Modular),
            Err(Error::SecretOutOfRange)
        ));
        let p = field::modulus().to_bytes_be();
        assert!(matches!(
            split_secret(&p, 3, 2, Reduction::Integer),
            Err(Error::SecretOutOfRange)
        ));
    }

    #[test]
    fn sixty_four_byte_secret_rejected() {
        let secret = random_secret(64);
        for reduction in [Reduction::Modular, Reduction::Integer] {
            assert!(matches!(
                split_secret(&secret, 4, 3, reduction),
                Err(Error::SecretOutOfRange)
            ));
        }
    }

    #[test]
    fn thirty_three_byte_secret_below_modulus_accepted() {
        let mut secret = random_secret(33);
        secret[0] = 0;
        secret[1] |= 0x80;
        for reduction in [Reduction::Modular, Reduction::Integer] {
            let set = split_secret(&secret, 4, 3, reduction).unwrap();
            let recovered = reconstruct_secret(&set.points[1..], 3).unwrap();
            assert_eq!(recovered.as_slice(), &secret[1..]);
        }
    }

    #[test]
    fn modular_shares_stay_below_modulus() {
        let mut secret = random_secret(32);
        secret[0] = 0xff;
        let modular = split_secret(&secret, 5, 5, Reduction::Modular).unwrap();
        assert!(modular.points.iter().all(|p| &p.y < field::modulus()));

        let integer = split_secret(&secret, 5, 5, Reduction::Integer).unwrap();
        assert!(integer.points.iter().any(|p| &p.y >= field::modulus()));
        let recovered = reconstruct_secret(&integer.points, 5).unwrap();
        assert_eq!(recovered.as_slice(), secret.as_slice());
    }

    #[test]
    fn normalize_strips_one_padding_zero_past_32_bytes() {
        let mut padded = vec![0u8];
        padded.extend_from_slice(&[0x80; 32]);
        assert_eq!(normalize(&padded), vec![0x80; 32]);

        // Only one zero goes, and only past 32 bytes.
        let mut double = vec![0u8, 0u8];
        double.extend_from_slice(&[0x80; 32]);
        assert_eq!(normalize(&double).len(), 33);
        assert_eq!(normalize(&[0x00, 0x80]), vec![0x00, 0x80]);
        assert_eq!(normalize(&[0x7f; 32]), vec![0x7f; 32]);
    }

    #[test]
    fn short_secret_with_top_bit_keeps_padding_byte() {
        let secret = [0x80u8, 0x01];
        let set = split_secret(&secret, 3, 2, Reduction::Modular).unwrap();
        let recovered = reconstruct_secret(&set.points, 2).unwrap();
        assert_eq!(recovered.as_slice(), &[0x00, 0x80, 0x01]);
        assert_eq!(value(&recovered), value(&secret));
    }
}
