use crate::error::Result;
use crate::keys::Key;
use crate::types::{Content, VersionUpdate, VersionedArtifact};
use chrono::{DateTime, Utc};

/// Versioned key-value store for draft artifacts
pub trait ContentStore: Send + Sync {
    // === Artifact Operations ===

    /// Full version history of a key
    fn get(&self, key: Key) -> Result<Option<VersionedArtifact>>;

    /// Append a version, make it active, and advance the key's timestamp.
    /// Atomic per key.
    fn append_version(&self, key: Key, content: Content) -> Result<VersionUpdate>;

    /// Point the active index at an existing version
    fn set_active(&self, key: Key, index: usize) -> Result<VersionUpdate>;

    /// Every key holding at least one version
    fn keys(&self) -> Result<Vec<Key>>;

    // === Metadata ===

    /// Store metadata key-value pair
    fn put_metadata(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve metadata by key
    fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>>;

    // === Convenience ===

    fn get_active(&self, key: Key) -> Result<Option<Content>> {
        Ok(self
            .get(key)?
            .and_then(|a| a.active_content().cloned()))
    }

    fn get_versions(&self, key: Key) -> Result<Vec<Content>> {
        Ok(self.get(key)?.map(|a| a.versions).unwrap_or_default())
    }

    fn get_timestamp(&self, key: Key) -> Result<Option<DateTime<Utc>>> {
        Ok(self.get(key)?.map(|a| a.updated_at))
    }
}
