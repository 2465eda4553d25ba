//! Content fingerprints
//!
//! A SHA-256 digest of a document's compact canonical encoding. The digest
//! depends only on content and order, so fingerprints taken in different
//! runs (or on different machines) of the same contents compare equal.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::codec;
use crate::error::SyncResult;
use crate::models::BackupDocument;

/// Digest of a document's contents, compared for equality only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a document
    pub fn of(doc: &BackupDocument) -> SyncResult<Self> {
        let canonical = codec::encode_compact(doc)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// Hex form of the digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
