//! Wallet records and their canonical serialized form
//!
//! A wallet file holds an ordered list of records. Before sealing, the list
//! is serialized as compact UTF-8 JSON:
//!
//! ```text
//! [{"name":"A","public_key":"pkA","private_key":"skA"}, ...]
//! ```
//!
//! Field order within each object is fixed and record order is display order.
//! None of the three fields is interpreted; key material is carried as opaque
//! text.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ErrorCategory, ErrorKind, Result, WalletboxError};

/// One account entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct WalletRecord {
    name: String,
    public_key: String,
    private_key: String,
}

impl WalletRecord {
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

// Secret key text must not end up in logs via {:?}.
impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("name", &self.name)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Ordered sequence of records. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletSet {
    records: Vec<WalletRecord>,
}

impl WalletSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: WalletRecord) {
        self.records.push(record);
    }

    /// Removes the record at display position `index`, shifting later records up.
    pub fn remove(&mut self, index: usize) -> Option<WalletRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&WalletRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WalletRecord> {
        self.records.iter()
    }
}

impl From<Vec<WalletRecord>> for WalletSet {
    fn from(records: Vec<WalletRecord>) -> Self {
        Self { records }
    }
}

impl IntoIterator for WalletSet {
    type Item = WalletRecord;
    type IntoIter = std::vec::IntoIter<WalletRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl Extend<WalletRecord> for WalletSet {
    fn extend<I: IntoIterator<Item = WalletRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl<'a> IntoIterator for &'a WalletSet {
    type Item = &'a WalletRecord;
    type IntoIter = std::slice::Iter<'a, WalletRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Serialize records to their canonical byte form.
///
/// The returned buffer holds private keys in clear text and is wiped on drop.
pub fn serialize(records: &WalletSet) -> Result<Zeroizing<Vec<u8>>> {
    // Cannot fail for string-only records.
    let bytes = serde_json::to_vec(records).map_err(|e| {
        WalletboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("failed to serialize wallet records: {}", e),
            e,
        )
    })?;
    Ok(Zeroizing::new(bytes))
}

/// Parse bytes produced by [`serialize`].
///
/// Anything that is not a JSON list of objects with string `name`,
/// `public_key` and `private_key` fields is rejected with
/// [`ErrorKind::MalformedRecordData`]. Unknown extra fields are ignored.
pub fn deserialize(bytes: &[u8]) -> Result<WalletSet> {
    // The parse error is dropped on purpose: it may quote plaintext.
    serde_json::from_slice(bytes)
        .map_err(|_| WalletboxError::decryption_failed(ErrorKind::MalformedRecordData))
}
