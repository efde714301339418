//! Arithmetic modulo the fixed prime `P`.
//!
//! `P` sits between 2^256 and 2^257, so any 32-byte secret (in particular a
//! SHA-256 digest) is already a field element. All functions accept
//! arbitrary non-negative integers and return canonical residues in `[0, P)`.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// P = 208351617316091241234326746312124448251235562226470491514186331217050270460481,
/// big-endian.
const MODULUS_BE: [u8; 33] = [
    0x01, 0xcc, 0xa2, 0xd6, 0x1c, 0x8b, 0x90, 0x93, 0xf4, 0x73, 0xc1, 0xfa, 0x8e, 0x3c, 0x7c, 0x65,
    0x4a, 0x8a, 0x66, 0xb1, 0x62, 0x6d, 0xa7, 0x8d, 0x23, 0x42, 0x92, 0x11, 0x7d, 0xd7, 0xd4, 0x6a,
    0x41,
];

/// The field prime.
pub fn modulus() -> &'static BigUint {
    static P: OnceLock<BigUint> = OnceLock::new();
    P.get_or_init(|| BigUint::from_bytes_be(&MODULUS_BE))
}

#[inline]
pub fn reduce(a: &BigUint) -> BigUint {
    a % modulus()
}

pub fn add(a: &BigUint, b: &BigUint) -> BigUint {
    (a + b) % modulus()
}

pub fn sub(a: &BigUint, b: &BigUint) -> BigUint {
    let p = modulus();
    ((a % p) + p - (b % p)) % p
}

pub fn mul(a: &BigUint, b: &BigUint) -> BigUint {
    (a * b) % modulus()
}

pub fn neg(a: &BigUint) -> BigUint {
    let p = modulus();
    (p - (a % p)) % p
}

/// Multiplicative inverse via the extended Euclidean algorithm.
///
/// Fails with [`Error::NoInverse`] when `a ≡ 0 (mod P)`; every other residue
/// is invertible because `P` is prime.
pub fn inv(a: &BigUint) -> Result<BigUint> {
    let p = modulus();
    let a_red = reduce(a);
    if a_red.is_zero() {
        return Err(Error::NoInverse(a.clone()));
    }

    // Invariant: old_s * a ≡ old_r (mod p).
    let (mut old_r, mut r) = (BigInt::from(a_red), BigInt::from(p.clone()));
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return Err(Error::NoInverse(a.clone()));
    }

    let p_int = BigInt::from(p.clone());
    let canonical = ((old_s % &p_int) + &p_int) % &p_int;
    Ok(canonical.magnitude().clone())
}
