//! Error taxonomy for the library.
//!
//! Every failure is surfaced as a distinct variant; nothing is retried.
//! The binary wraps these in `anyhow` with extra context.

use num_bigint::BigUint;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Fewer usable points than the threshold.
    #[error("need at least {threshold} shares, have {available}")]
    InsufficientShares { threshold: usize, available: usize },

    /// The share file has no threshold trailer line.
    #[error("share file has no threshold line")]
    MissingThreshold,

    /// Operand is congruent to zero modulo the field prime.
    #[error("{0} has no inverse modulo the field prime")]
    NoInverse(BigUint),

    #[error("{op} {path:?}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying symmetric cipher failed (bad length, bad padding).
    #[error("cipher: {0}")]
    Cipher(String),

    #[error("invalid threshold {threshold} for {total} shares (need 2 <= threshold <= total)")]
    InvalidThreshold { threshold: usize, total: usize },

    #[error("secret does not fit in the field (must be smaller than the prime modulus)")]
    SecretOutOfRange,

    /// Reconstructed secret wider than the secret it should stand for.
    #[error("reconstructed secret is {actual} bytes, expected at most {expected} (wrong shares?)")]
    KeyMaterialWidth { expected: usize, actual: usize },

    #[error("share file: {0}")]
    MalformedShares(String),

    #[error("encrypted container: {0}")]
    MalformedContainer(String),

    #[error("file name is {0} bytes, exceeds maximum of 255")]
    FilenameTooLong(usize),
}

impl Error {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
