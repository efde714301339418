//! fragcrypt: encrypt a file and split its key with Shamir secret sharing.
//!
//! The password digest is split into N shares over a 257-bit prime field;
//! any K of them rebuild it, fewer reveal nothing. The digest's SHA-256 keys
//! the bulk cipher.
//!
//! - [`sss`]: polynomial split, point generation, Lagrange reconstruction.
//! - [`share`]: the `.frg` share file.
//! - [`encrypted`]: the `.aes` container.
//! - [`crypto`]: key derivation, cipher, and the [`crypto::seal`] /
//!   [`crypto::open`] pipeline.

pub mod crypto;
pub mod encrypted;
pub mod error;
pub mod field;
pub mod io;
pub mod share;
pub mod sss;

pub use error::{Error, Result};
