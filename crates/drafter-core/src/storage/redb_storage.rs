use super::{append_to, select_in, ContentStore, MonotonicClock};
use crate::error::{DraftError, Result};
use crate::keys::Key;
use crate::types::{Content, VersionUpdate, VersionedArtifact};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Table definitions
const ARTIFACTS: TableDefinition<&str, &[u8]> = TableDefinition::new("artifacts");

// Metadata table
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current session file schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Session file backed by redb. Artifacts are stored as JSON so structured
/// model output survives reopening unchanged.
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
    clock: MonotonicClock,
}

impl RedbStore {
    /// Open or create a session file at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let is_new = !path.exists();
        let db = Database::create(&path)?;

        if is_new {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(ARTIFACTS)?;
                let mut meta = write_txn.open_table(META)?;
                meta.insert(SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION.to_string().as_bytes())?;
            }
            write_txn.commit()?;
        } else {
            Self::check_schema_version(&db)?;
        }

        let store = Self {
            db: Arc::new(db),
            path,
            clock: MonotonicClock::default(),
        };
        store.seed_clock()?;
        Ok(store)
    }

    fn check_schema_version(db: &Database) -> Result<()> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(META)?;
        let version = table
            .get(SCHEMA_VERSION_KEY)?
            .and_then(|v| std::str::from_utf8(v.value()).ok().and_then(|s| s.parse::<u32>().ok()))
            .unwrap_or(0);

        if version == CURRENT_SCHEMA_VERSION {
            Ok(())
        } else {
            Err(DraftError::Validation(format!(
                "Session file schema v{} does not match this binary (v{})",
                version, CURRENT_SCHEMA_VERSION
            )))
        }
    }

    fn seed_clock(&self) -> Result<()> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTIFACTS)?;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let artifact: VersionedArtifact = serde_json::from_slice(value.value())?;
            self.clock.observe(artifact.updated_at);
        }
        Ok(())
    }

    /// Get the session file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentStore for RedbStore {
    fn get(&self, key: Key) -> Result<Option<VersionedArtifact>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTIFACTS)?;
        let artifact = match table.get(key.as_str())? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(artifact)
    }

    fn append_version(&self, key: Key, content: Content) -> Result<VersionUpdate> {
        let write_txn = self.db.begin_write()?;
        let update = {
            let mut table = write_txn.open_table(ARTIFACTS)?;
            let existing: Option<VersionedArtifact> = match table.get(key.as_str())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            let (artifact, update) = append_to(key, existing, content, self.clock.next());
            let bytes = serde_json::to_vec(&artifact)?;
            table.insert(key.as_str(), bytes.as_slice())?;
            update
        };
        write_txn.commit()?;
        Ok(update)
    }

    fn set_active(&self, key: Key, index: usize) -> Result<VersionUpdate> {
        let write_txn = self.db.begin_write()?;
        let update = {
            let mut table = write_txn.open_table(ARTIFACTS)?;
            let existing: Option<VersionedArtifact> = match table.get(key.as_str())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            let mut artifact = existing.ok_or_else(|| DraftError::InvalidVersionIndex {
                key: key.to_string(),
                index,
                len: 0,
            })?;
            let (update, changed) = select_in(key, &mut artifact, index, self.clock.next())?;
            if changed {
                let bytes = serde_json::to_vec(&artifact)?;
                table.insert(key.as_str(), bytes.as_slice())?;
            }
            update
        };
        write_txn.commit()?;
        Ok(update)
    }

    fn keys(&self) -> Result<Vec<Key>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ARTIFACTS)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (name, _) = entry?;
            match name.value().parse::<Key>() {
                Ok(key) => keys.push(key),
                Err(_) => log::warn!("Ignoring unknown artifact key in session file: {}", name.value()),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn put_metadata(&self, key: &str, value: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(META)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META)?;
        let value = table.get(key)?.map(|v| v.value().to_vec());
        Ok(value)
    }
}
