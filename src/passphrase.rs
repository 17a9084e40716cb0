//! Passphrase acquisition
//!
//! Every reader hands out the passphrase wrapped in `Zeroizing`, so each copy
//! is wiped from memory when the caller drops it.

use crate::error::{ErrorCategory, ErrorKind, Result, WalletboxError};
use std::io::{self, IsTerminal, Read};
use zeroize::Zeroizing;

/// Trait for reading passphrases from various sources
pub trait PassphraseReader {
    /// Read a passphrase as arbitrary bytes (not necessarily UTF-8)
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

fn empty_passphrase() -> WalletboxError {
    WalletboxError::with_kind(
        ErrorCategory::User,
        ErrorKind::PassphraseUnavailable,
        "passphrase must not be empty",
    )
}

/// Returns a fixed passphrase (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.passphrase.clone())
    }
}

/// Reads passphrase from any io::Read source, typically piped stdin
///
/// Everything up to EOF is the passphrase, minus one trailing `\n` or `\r\n`
/// so that `echo secret | walletbox ...` does what it looks like.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            WalletboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading passphrase: {}", e),
                e,
            )
        })?;

        if data.ends_with(b"\n") {
            data.pop();
            if data.ends_with(b"\r") {
                data.pop();
            }
        }
        if data.is_empty() {
            return Err(empty_passphrase());
        }
        Ok(data)
    }
}

/// Reads passphrase from terminal with no echo
pub struct TerminalPassphraseReader {
    confirm: bool,
}

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self { confirm: false }
    }

    /// Prompt twice and insist both entries match. Used when a passphrase
    /// is chosen for a new wallet file, where a typo would lock the owner out.
    pub fn with_confirmation() -> Self {
        Self { confirm: true }
    }

    fn prompt(prompt: &str) -> Result<Zeroizing<Vec<u8>>> {
        // rpassword returns a plain String; move it straight into Zeroizing.
        let passphrase = rpassword::prompt_password(prompt).map_err(|e| {
            WalletboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?;
        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read passphrase from terminal.
    ///
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    /// For non-UTF-8 passphrases, use --passphrase-stdin instead.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(WalletboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let passphrase = Self::prompt("Passphrase (walletbox): ")?;
        if passphrase.is_empty() {
            return Err(empty_passphrase());
        }

        if self.confirm {
            let again = Self::prompt("Confirm passphrase (walletbox): ")?;
            if *again != *passphrase {
                return Err(WalletboxError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::PassphraseUnavailable,
                    "passphrases do not match",
                ));
            }
        }

        Ok(passphrase)
    }
}

/// Wraps another PassphraseReader and caches the result
///
/// Provides "at most once" semantics - the upstream reader is called
/// only on the first successful invocation, and subsequent calls return the
/// cached value. Errors are not cached.
pub struct CachingPassphraseReader<'a> {
    upstream: &'a mut dyn PassphraseReader,
    cached: Option<Zeroizing<Vec<u8>>>,
}

impl<'a> CachingPassphraseReader<'a> {
    pub fn new(upstream: &'a mut dyn PassphraseReader) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

impl PassphraseReader for CachingPassphraseReader<'_> {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        match &self.cached {
            Some(passphrase) => Ok(passphrase.clone()),
            None => {
                let passphrase = self.upstream.read_passphrase()?;
                self.cached = Some(passphrase.clone());
                Ok(passphrase)
            }
        }
    }
}
