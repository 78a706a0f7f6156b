//! Scope identity and the storage key derived from it.

use sha2::{Digest, Sha256};

/// Partition of the cache, typically one SharePoint web.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
  /// Identifier the cache is keyed by (web id)
  pub id: String,
  /// Absolute URL of the web the notices list lives in
  pub base_url: String,
}

impl Scope {
  pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      base_url: base_url.into(),
    }
  }

  /// Storage key for this scope's snapshot.
  ///
  /// Web ids are GUIDs, so the id is trimmed and lowercased before hashing.
  pub fn storage_key(&self) -> String {
    let input = format!("notices:{}", self.id.trim().to_lowercase());

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }
}
