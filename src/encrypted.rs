//! Encrypted container format (`.aes`).
//!
//! ## Binary layout (variable, ≥3 bytes)
//!
//! | Field        | Offset    | Size      | Description                          |
//! |--------------|-----------|-----------|--------------------------------------|
//! | total        | 0         | 1         | N, shares written                    |
//! | threshold    | 1         | 1         | K, shares required to decrypt        |
//! | name_len     | 2         | 1         | length of UTF-8 file name (0–255)    |
//! | name         | 3         | 0–255     | original plaintext file name         |
//! | ciphertext   | 3+L       | variable  | raw cipher output, to end of file    |
//!
//! There are no separators, no magic and no version byte.
//!
//! ## Security
//!
//! The container carries no IV and no authentication tag. With the shipped
//! [`crate::crypto::Aes256Ecb`] cipher, equal plaintext blocks encrypt to
//! equal ciphertext blocks and tampering is only noticed if it breaks the
//! padding. The format gives confidentiality under that mode and nothing
//! more; wrap it in authenticated encryption if integrity matters.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::io;

/// Maximum file name length in bytes.
const MAX_NAME_LEN: usize = 255;

/// total(1) + threshold(1) + name_len(1).
const HEADER_LEN: usize = 3;

/// Suggested container extension.
pub const CONTAINER_EXTENSION: &str = "aes";

/// In-memory representation of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedFile {
    pub total: u8,
    pub threshold: u8,
    pub filename: String,
    pub ciphertext: Vec<u8>,
}

impl EncryptedFile {
    /// Serialize to the binary format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilenameTooLong`] if the UTF-8 file name is longer
    /// than 255 bytes, since the format reserves a single length byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = self.filename.as_bytes();
        if name.len() > MAX_NAME_LEN {
            return Err(Error::FilenameTooLong(name.len()));
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + name.len() + self.ciphertext.len());
        buf.push(self.total);
        buf.push(self.threshold);
        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.ciphertext);
        Ok(buf)
    }

    /// Parse from the binary format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedContainer(format!(
                "too small: {} bytes (need >= {HEADER_LEN})",
                bytes.len()
            )));
        }

        let total = bytes[0];
        let threshold = bytes[1];
        let name_len = bytes[2] as usize;
        let name_end = HEADER_LEN + name_len;
        if bytes.len() < name_end {
            return Err(Error::MalformedContainer(format!(
                "truncated: name_len={name_len}, need >= {name_end} bytes, got {}",
                bytes.len()
            )));
        }

        let filename = String::from_utf8(bytes[HEADER_LEN..name_end].to_vec())
            .map_err(|_| Error::MalformedContainer("file name is not valid UTF-8".into()))?;

        Ok(Self {
            total,
            threshold,
            filename,
            ciphertext: bytes[name_end..].to_vec(),
        })
    }

    /// Read and parse a container file.
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_bytes(&io::read_file(path)?)
    }

    /// Serialize and write atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        io::write_atomic(path, &self.to_bytes()?)
    }
}

impl fmt::Display for EncryptedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-of-{} file={:?} ciphertext={} bytes",
            self.threshold,
            self.total,
            self.filename,
            self.ciphertext.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
