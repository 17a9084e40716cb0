use std::error::Error as StdError;

use thiserror::Error;

/// Message shown for every failure to open a sealed container.
///
/// Too-short input, bad padding and undecodable records all surface with
/// this exact text so that nothing observable tells which stage rejected
/// the input.
pub const DECRYPTION_FAILED_MSG: &str = "decryption failed: wrong passphrase or corrupted file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee that the error is not, for
    /// example, caused by the user; it merely cannot be determined by the code.
    Internal,

    /// The user provided invalid input (including a wrong passphrase) or
    /// asked for something that cannot be done.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Input is shorter than the fixed salt and IV header.
    ContainerTooShort,
    /// Block padding was not well formed after decryption. This is the usual
    /// outcome of a wrong passphrase.
    InvalidPadding,
    /// Plaintext did not decode to a list of wallet records.
    MalformedRecordData,
    /// The operating system random source could not be read.
    RandomSourceUnavailable,
    /// PBKDF2 rejected its parameters.
    KeyDerivationFailure,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// A plaintext records file supplied by the user did not parse.
    InvalidRecordsFile,
    /// A record index did not refer to an existing record.
    RecordNotFound,
    /// Refused to overwrite an existing wallet file.
    AlreadyExists,
    /// Unexpected state reached within walletbox logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct WalletboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl WalletboxError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// A failure to open a container, tagged with the stage that rejected it.
    ///
    /// Never carries a source error; the uniform message is all that leaves
    /// the engine.
    pub(crate) fn decryption_failed(kind: ErrorKind) -> Self {
        Self::with_kind(ErrorCategory::User, kind, DECRYPTION_FAILED_MSG)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// True if the container could not be opened with the given passphrase.
    ///
    /// Callers presenting errors to a person should treat all of these the same.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self.kind,
            Some(ErrorKind::ContainerTooShort)
                | Some(ErrorKind::InvalidPadding)
                | Some(ErrorKind::MalformedRecordData)
        )
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, WalletboxError>;
