//! walletbox - passphrase-sealed storage for wallet key records
//!
//! A wallet file is an ordered list of [`WalletRecord`]s serialized as JSON
//! and sealed with a key derived from a passphrase (PBKDF2-HMAC-SHA256,
//! AES-256-CBC). See [`container`] for the byte layout.
//!
//! ```no_run
//! use walletbox::{WalletRecord, WalletSet, seal, unseal};
//!
//! let records = WalletSet::from(vec![WalletRecord::new("A", "pkA", "skA")]);
//! let sealed = seal(&records, b"correct horse")?;
//! assert_eq!(unseal(&sealed, b"correct horse")?, records);
//! # Ok::<(), walletbox::WalletboxError>(())
//! ```

#![forbid(unsafe_code)]

pub mod container;
pub mod error;
pub mod passphrase;
pub mod record;
pub mod store;

pub use container::{seal, unseal};
pub use error::{ErrorCategory, ErrorKind, Result, WalletboxError};
pub use record::{WalletRecord, WalletSet};
