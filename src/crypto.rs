//! Key derivation, the bulk cipher, and the encrypt/decrypt pipeline.
//!
//! Key hierarchy:
//!
//! ```text
//!   password
//!     └─ SHA-256 → secret (32 bytes) ── split into shares ──▶ .frg
//!                    └─ SHA-256 → AES-256 key ── encrypt ──▶ .aes
//! ```

use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::encrypted::EncryptedFile;
use crate::error::{Error, Result};
use crate::sss::{self, Point, Reduction, ShareSet};

/// Secret width: the password digest that gets split.
pub const SECRET_LEN: usize = 32;

/// Symmetric key width (AES-256).
pub const KEY_LEN: usize = 32;

const AES_BLOCK_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// SHA-256 of the password's UTF-8 bytes; this is the secret that is split.
pub fn hash_password(password: &str) -> [u8; SECRET_LEN] {
    Sha256::digest(password.as_bytes()).into()
}

/// SHA-256 of an arbitrary-length secret, used directly as the AES-256 key.
pub fn derive_key(secret: &[u8]) -> [u8; KEY_LEN] {
    Sha256::digest(secret).into()
}

/// Fit reconstructed bytes to a secret of known width.
///
/// Reconstruction returns the integer's minimal encoding, which can be
/// shorter than the original (leading zero bytes) or carry one padding zero.
/// Leading zeros are dropped and the rest is left-padded to `len`.
pub fn fit_key_material(bytes: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[start..];
    if significant.len() > len {
        return Err(Error::KeyMaterialWidth {
            expected: len,
            actual: significant.len(),
        });
    }
    let mut out = Zeroizing::new(vec![0u8; len]);
    out[len - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

/// Bulk symmetric cipher behind the container.
///
/// Mode parameters are the implementation's own business; the container
/// stores none.
pub trait Cipher {
    fn encrypt(&self, plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>>;
}

/// AES-256 in ECB mode with PKCS#7 padding.
///
/// No IV, no authentication: equal blocks encrypt equally and only padding
/// damage is detected on decrypt.
#[derive(Clone, Copy, Debug, Default)]
pub struct Aes256Ecb;

type Aes256EcbEnc = ecb::Encryptor<aes::Aes256>;
type Aes256EcbDec = ecb::Decryptor<aes::Aes256>;

impl Cipher for Aes256Ecb {
    fn encrypt(&self, plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
        let enc =
            Aes256EcbEnc::new_from_slice(key).map_err(|e| Error::Cipher(e.to_string()))?;
        Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
            return Err(Error::Cipher(format!(
                "ciphertext length {} is not a positive multiple of {AES_BLOCK_LEN}",
                ciphertext.len()
            )));
        }
        let dec =
            Aes256EcbDec::new_from_slice(key).map_err(|e| Error::Cipher(e.to_string()))?;
        dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::Cipher("bad padding (wrong shares or corrupted data?)".into()))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under a key derived from `password` and split the
/// password digest into `total` shares with threshold `threshold`.
pub fn seal<C: Cipher + ?Sized>(
    plaintext: &[u8],
    password: &str,
    filename: &str,
    total: u8,
    threshold: u8,
    reduction: Reduction,
    cipher: &C,
) -> Result<(EncryptedFile, ShareSet)> {
    if filename.len() > u8::MAX as usize {
        return Err(Error::FilenameTooLong(filename.len()));
    }

    let secret = Zeroizing::new(hash_password(password));
    let shares = sss::split_secret(secret.as_slice(), total, threshold, reduction)?;

    let key = Zeroizing::new(derive_key(secret.as_slice()));
    let ciphertext = cipher.encrypt(plaintext, &key)?;
    debug!(
        plaintext = plaintext.len(),
        ciphertext = ciphertext.len(),
        "sealed"
    );

    let file = EncryptedFile {
        total,
        threshold,
        filename: filename.to_string(),
        ciphertext,
    };
    Ok((file, shares))
}

/// Reconstruct the key from `points` and decrypt `file`.
pub fn open<C: Cipher + ?Sized>(
    file: &EncryptedFile,
    points: &[Point],
    threshold: u8,
    cipher: &C,
) -> Result<Zeroizing<Vec<u8>>> {
    if file.threshold != threshold {
        warn!(
            container = file.threshold,
            shares = threshold,
            "container and share file disagree on the threshold; using the share file's"
        );
    }

    let recovered = sss::reconstruct_secret(points, threshold)?;
    let secret = fit_key_material(&recovered, SECRET_LEN)?;
    let key = Zeroizing::new(derive_key(&secret));
    let plaintext = cipher.decrypt(&file.ciphertext, &key)?;
    Ok(Zeroizing::new(plaintext))
}
