//! Wallet file operations
//!
//! This module provides the filesystem side of walletbox: creating, opening,
//! and replacing sealed wallet files, plus import/export of the plaintext
//! JSON record list.
//!
//! Wallet files and plaintext exports are created with mode 0o600
//! (read/write for owner only) on Unix systems. Replacing an existing wallet
//! file is atomic: either the old file or the complete new file exists, never
//! a partial one.

use crate::container;
use crate::error::{ErrorCategory, ErrorKind, Result, WalletboxError};
use crate::passphrase::{CachingPassphraseReader, PassphraseReader};
use crate::record::{WalletRecord, WalletSet};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Open and decrypt the wallet file at `wallet_path`.
pub fn load(wallet_path: &Path, passphrase_reader: &mut dyn PassphraseReader) -> Result<WalletSet> {
    let sealed = fs::read(wallet_path).map_err(|e| read_error(wallet_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;
    container::unseal(&sealed, &passphrase).map_err(|e| {
        warn!(path = %wallet_path.display(), "failed to open wallet file");
        debug!(kind = ?e.kind, "wallet unlock failure detail");
        e.with_context(format!("failed to decrypt {}", wallet_path.display()))
    })
}

/// Seal `records` and atomically write them to `wallet_path`, replacing any
/// existing file.
pub fn save(
    wallet_path: &Path,
    records: &WalletSet,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let passphrase = passphrase_reader.read_passphrase()?;
    let sealed = container::seal(records, &passphrase)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_atomic(wallet_path, &sealed)
        .map_err(|e| e.with_context(format!("failed to write to {}", wallet_path.display())))?;
    info!(path = %wallet_path.display(), records = records.len(), "saved wallet file");
    Ok(())
}

/// Create a new wallet file holding no records.
///
/// Fails with [`ErrorKind::AlreadyExists`] rather than overwrite a file.
pub fn create_empty(wallet_path: &Path, passphrase_reader: &mut dyn PassphraseReader) -> Result<()> {
    let passphrase = passphrase_reader.read_passphrase()?;
    let sealed = container::seal(&WalletSet::new(), &passphrase)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(wallet_path, &sealed, true)?;
    info!(path = %wallet_path.display(), "created empty wallet file");
    Ok(())
}

/// Seal a plaintext JSON record list into a wallet file
///
/// Reads records from `records_path`, seals them using a passphrase from
/// `passphrase_reader`, and writes the container to `wallet_path`.
pub fn seal_file(
    records_path: &Path,
    wallet_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let records = read_records_file(records_path)?;
    save(wallet_path, &records, passphrase_reader)
}

/// Decrypt a wallet file into a plaintext JSON record list
///
/// The output holds private keys in clear text.
pub fn unseal_file(
    wallet_path: &Path,
    records_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let records = load(wallet_path, passphrase_reader)?;
    write_records_file(records_path, &records)
}

/// Replace the records of an existing wallet file using the same passphrase
///
/// This function:
/// 1. Reads the new records from `records_path`
/// 2. Decrypts the existing file at `wallet_path` to validate the passphrase
/// 3. Seals the new records with the validated passphrase
/// 4. Atomically writes to `wallet_path` (tempfile + fsync + rename)
///
/// The passphrase validation prevents accidental passphrase changes.
pub fn update_file(
    records_path: &Path,
    wallet_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let new_records = read_records_file(records_path)?;
    modify(wallet_path, passphrase_reader, |records| {
        *records = new_records;
        Ok(())
    })
}

/// Append the records listed in `records_path` to an existing wallet file.
///
/// Returns the number of records in the wallet afterwards.
pub fn append_records(
    records_path: &Path,
    wallet_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<usize> {
    let new_records = read_records_file(records_path)?;
    modify(wallet_path, passphrase_reader, |records| {
        records.extend(new_records);
        Ok(records.len())
    })
}

/// Remove the record at zero-based display position `index`.
pub fn remove_record(
    wallet_path: &Path,
    index: usize,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<WalletRecord> {
    modify(wallet_path, passphrase_reader, |records| {
        let count = records.len();
        records.remove(index).ok_or_else(|| {
            WalletboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::RecordNotFound,
                format!("no record at index {} (wallet holds {})", index, count),
            )
        })
    })
}

/// Open the wallet, let `edit` change the records, then reseal with the
/// same passphrase. Nothing is written if opening or `edit` fails.
fn modify<T>(
    wallet_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    edit: impl FnOnce(&mut WalletSet) -> Result<T>,
) -> Result<T> {
    let mut reader = CachingPassphraseReader::new(passphrase_reader);
    let mut records = load(wallet_path, &mut reader)?;
    let outcome = edit(&mut records)?;
    save(wallet_path, &records, &mut reader)?;
    Ok(outcome)
}

fn read_records_file(path: &Path) -> Result<WalletSet> {
    let bytes = Zeroizing::new(fs::read(path).map_err(|e| read_error(path, e))?);
    serde_json::from_slice(&bytes).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidRecordsFile,
            format!(
                "{} is not a JSON list of name/public_key/private_key records",
                path.display()
            ),
            e,
        )
    })
}

fn write_records_file(path: &Path, records: &WalletSet) -> Result<()> {
    let mut json = Zeroizing::new(serde_json::to_vec_pretty(records).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to format wallet records",
            e,
        )
    })?);
    json.push(b'\n');
    write_file_secure(path, &json, false)
        .map_err(|e| e.with_context(format!("failed to write to {}", path.display())))
}

/// Replace `path` atomically (tempfile in the same directory, fsync, rename).
fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                WalletboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }
    temp_file.persist(path).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    debug!(path = %path.display(), bytes = contents.len(), "replaced file atomically");
    Ok(())
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8], create_new: bool) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        let kind = if e.kind() == io::ErrorKind::AlreadyExists {
            ErrorKind::AlreadyExists
        } else {
            ErrorKind::Io
        };
        WalletboxError::with_kind_and_source(
            ErrorCategory::User,
            kind,
            format!("failed to open {}", path.display()),
            e,
        )
    })?;

    file.write_all(contents).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to write {}", path.display()),
            e,
        )
    })?;
    file.sync_all().map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to sync {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> WalletboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    WalletboxError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
