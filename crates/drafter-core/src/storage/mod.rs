mod memory;
mod redb_storage;
mod traits;

pub use memory::MemoryStore;
pub use redb_storage::{RedbStore, CURRENT_SCHEMA_VERSION};
pub use traits::ContentStore;

use crate::error::{DraftError, Result};
use crate::keys::Key;
use crate::types::{Content, VersionUpdate, VersionedArtifact};
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Hands out strictly increasing timestamps so that a later write always
/// compares greater than an earlier one, even within one clock tick.
#[derive(Debug, Default)]
pub(crate) struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub(crate) fn next(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let ts = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(ts);
        ts
    }

    /// Seed from persisted data so reopened stores never go backwards.
    pub(crate) fn observe(&self, ts: DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.map_or(true, |prev| ts > prev) {
            *last = Some(ts);
        }
    }
}

pub(crate) fn append_to(
    key: Key,
    existing: Option<VersionedArtifact>,
    content: Content,
    at: DateTime<Utc>,
) -> (VersionedArtifact, VersionUpdate) {
    let mut artifact = existing.unwrap_or(VersionedArtifact {
        versions: Vec::new(),
        active: 0,
        updated_at: at,
    });
    artifact.versions.push(content);
    artifact.active = artifact.versions.len() - 1;
    artifact.updated_at = at;
    let update = update_of(key, &artifact);
    (artifact, update)
}

/// Switching to a different version counts as a content change and moves the
/// timestamp; re-selecting the active version does not.
pub(crate) fn select_in(
    key: Key,
    artifact: &mut VersionedArtifact,
    index: usize,
    at: DateTime<Utc>,
) -> Result<(VersionUpdate, bool)> {
    if index >= artifact.versions.len() {
        return Err(DraftError::InvalidVersionIndex {
            key: key.to_string(),
            index,
            len: artifact.versions.len(),
        });
    }
    let changed = artifact.active != index;
    if changed {
        artifact.active = index;
        artifact.updated_at = at;
    }
    Ok((update_of(key, artifact), changed))
}

fn update_of(key: Key, artifact: &VersionedArtifact) -> VersionUpdate {
    VersionUpdate {
        key,
        index: artifact.active,
        count: artifact.versions.len(),
        updated_at: artifact.updated_at,
    }
}
