use super::{append_to, select_in, ContentStore, MonotonicClock};
use crate::error::{DraftError, Result};
use crate::keys::Key;
use crate::types::{Content, VersionUpdate, VersionedArtifact};
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-session in-memory store. Discarded on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: RwLock<HashMap<Key, VersionedArtifact>>,
    metadata: RwLock<HashMap<String, Vec<u8>>>,
    clock: MonotonicClock,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> DraftError {
    DraftError::Validation("memory store lock poisoned".into())
}

impl ContentStore for MemoryStore {
    fn get(&self, key: Key) -> Result<Option<VersionedArtifact>> {
        Ok(self.artifacts.read().map_err(poisoned)?.get(&key).cloned())
    }

    fn append_version(&self, key: Key, content: Content) -> Result<VersionUpdate> {
        let mut artifacts = self.artifacts.write().map_err(poisoned)?;
        let at = self.clock.next();
        let (artifact, update) = append_to(key, artifacts.remove(&key), content, at);
        artifacts.insert(key, artifact);
        Ok(update)
    }

    fn set_active(&self, key: Key, index: usize) -> Result<VersionUpdate> {
        let mut artifacts = self.artifacts.write().map_err(poisoned)?;
        let artifact = artifacts
            .get_mut(&key)
            .ok_or_else(|| DraftError::InvalidVersionIndex {
                key: key.to_string(),
                index,
                len: 0,
            })?;
        let (update, _) = select_in(key, artifact, index, self.clock.next())?;
        Ok(update)
    }

    fn keys(&self) -> Result<Vec<Key>> {
        let mut keys: Vec<Key> = self.artifacts.read().map_err(poisoned)?.keys().copied().collect();
        keys.sort();
        Ok(keys)
    }

    fn put_metadata(&self, key: &str, value: &[u8]) -> Result<()> {
        self.metadata
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.metadata.read().map_err(poisoned)?.get(key).cloned())
    }
}
