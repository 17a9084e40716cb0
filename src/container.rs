//! Sealed wallet containers using PBKDF2-HMAC-SHA256 + AES-256-CBC
//!
//! This module implements passphrase-based encryption of a [`WalletSet`]:
//! - PBKDF2 with HMAC-SHA256 (100,000 iterations) derives a 256-bit key
//! - AES-256 in CBC mode with PKCS#7 padding encrypts the serialized records
//!
//! The binary format (version 1, no header) is:
//! - salt: 16 bytes
//! - iv: 16 bytes
//! - ciphertext: the rest, always a non-zero multiple of 16 bytes
//!
//! The iteration count is part of the format. Changing it makes every existing
//! container undecryptable, so a different count must come with a new format
//! version.
//!
//! CBC is not authenticated. A wrong passphrase or a damaged salt changes the
//! key and scrambles every block; damaged ciphertext scrambles whole blocks.
//! The padding check or the record decoder rejects those. An IV change is
//! different: flipping IV byte `k` flips exactly plaintext byte `k` of the
//! first block. When that byte sits inside a record value, the container still
//! opens and yields altered records.
//!
//! The AES key schedule and the CBC state are wiped on drop, so no copy of the
//! derived key outlives a call.

use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, WalletboxError};
use crate::record::{self, WalletSet};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of the CBC initialization vector in bytes
pub const IV_LEN: usize = 16;

/// Length of the fixed salt + IV header in bytes
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN;

/// AES block size in bytes
pub const BLOCK_LEN: usize = 16;

/// Length of derived key in bytes
const KEY_LEN: usize = 32;

/// PBKDF2 iteration count for format version 1
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Size of a container holding `plaintext_len` bytes of serialized records.
///
/// PKCS#7 always adds between 1 and 16 bytes, so a plaintext that is already
/// block aligned gains a whole block.
pub fn sealed_len(plaintext_len: usize) -> usize {
    HEADER_LEN + (plaintext_len / BLOCK_LEN + 1) * BLOCK_LEN
}

/// Derive a 32-byte key from a passphrase and salt using PBKDF2-HMAC-SHA256
fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, PBKDF2_ROUNDS, &mut key[..]).map_err(
        |e| {
            WalletboxError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::KeyDerivationFailure,
                format!("PBKDF2 key derivation failed: {}", e),
            )
        },
    )?;
    Ok(key)
}

fn fill_random(buf: &mut [u8], what: &str) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::RandomSourceUnavailable,
            format!("failed to generate random {}", what),
            e,
        )
    })
}

/// Seal wallet records with a passphrase using a fresh random salt and IV
///
/// Returns the binary format: salt(16) + iv(16) + ciphertext(variable)
pub fn seal(records: &WalletSet, passphrase: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt, "salt")?;

    let mut iv = [0u8; IV_LEN];
    fill_random(&mut iv, "iv")?;

    seal_deterministic(records, passphrase, &salt, &iv)
}

/// Seal wallet records with a passphrase using provided salt and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `seal()` which generates random salt/IV.
pub fn seal_deterministic(
    records: &WalletSet,
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    let plaintext = record::serialize(records)?;
    let sealed = seal_bytes(&plaintext, passphrase, salt, iv)?;
    debug!(
        records = records.len(),
        plaintext_len = plaintext.len(),
        sealed_len = sealed.len(),
        "sealed wallet container"
    );
    Ok(sealed)
}

fn seal_bytes(
    plaintext: &[u8],
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256CbcEnc::new_from_slices(&key[..], iv).map_err(|e| {
        WalletboxError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("failed to initialize cipher: {}", e),
        )
    })?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    output.extend_from_slice(salt);
    output.extend_from_slice(iv);
    output.extend_from_slice(&ciphertext);

    if output.len() != sealed_len(plaintext.len()) {
        return Err(WalletboxError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "sealed container has unexpected length",
        ));
    }

    Ok(output)
}

/// Open a sealed container with a passphrase
///
/// Every rejection of the input (too short, bad padding, undecodable records)
/// produces the same message; only [`WalletboxError::kind`] differs.
pub fn unseal(data: &[u8], passphrase: &[u8]) -> Result<WalletSet> {
    let plaintext = unseal_bytes(data, passphrase)?;
    let records = record::deserialize(&plaintext)?;
    debug!(
        records = records.len(),
        sealed_len = data.len(),
        "opened wallet container"
    );
    Ok(records)
}

fn unseal_bytes(data: &[u8], passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if data.len() < HEADER_LEN {
        return Err(WalletboxError::decryption_failed(
            ErrorKind::ContainerTooShort,
        ));
    }

    let (header, ciphertext) = data.split_at(HEADER_LEN);
    let (salt, iv) = header.split_at(SALT_LEN);
    let salt: &[u8; SALT_LEN] = salt.try_into().map_err(|_| {
        WalletboxError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to read salt",
        )
    })?;

    // An empty or ragged ciphertext region can never carry valid padding.
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(WalletboxError::decryption_failed(ErrorKind::InvalidPadding));
    }

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256CbcDec::new_from_slices(&key[..], iv).map_err(|e| {
        WalletboxError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("failed to initialize cipher: {}", e),
        )
    })?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| WalletboxError::decryption_failed(ErrorKind::InvalidPadding))?;

    Ok(Zeroizing::new(plaintext))
}
