//! Core SnapshotStore implementation

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::SNAPSHOT_EXT;

/// Directory-backed store of keyed JSON snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl SnapshotStore {
    /// Open or create a snapshot store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened snapshot store");
        Ok(Self { base_path })
    }

    /// Directory this store writes into
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn snapshot_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(eyre!("Invalid snapshot key: '{}'", key));
        }
        Ok(self.base_path.join(format!("{}.{}", key, SNAPSHOT_EXT)))
    }

    fn lock(&self) -> Result<fs::File> {
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(".lock"))
            .context("Failed to open store lock file")?;
        lock_file.lock_exclusive().context("Failed to lock snapshot store")?;
        Ok(lock_file)
    }

    /// Replace the snapshot stored under `key`
    ///
    /// The document is written to a temporary file and renamed into place so a
    /// crash never leaves a half-written snapshot behind.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        debug!(%key, "save: called");
        let path = self.snapshot_path(key)?;
        let content = serde_json::to_vec_pretty(value).context("Failed to serialize snapshot")?;

        let lock = self.lock()?;
        let tmp_path = path.with_extension(format!("{}.tmp", SNAPSHOT_EXT));
        {
            let mut tmp = fs::File::create(&tmp_path).context("Failed to create temporary snapshot")?;
            tmp.write_all(&content)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &path).context("Failed to move snapshot into place")?;
        FileExt::unlock(&lock)?;

        info!(%key, bytes = content.len(), "Saved snapshot");
        Ok(())
    }

    /// Load the snapshot stored under `key`
    ///
    /// Returns `Ok(None)` when nothing was saved or the stored document no
    /// longer parses as `T`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        debug!(%key, "load: called");
        let path = self.snapshot_path(key)?;
        if !path.exists() {
            debug!(?path, "load: no snapshot on disk");
            return Ok(None);
        }

        let raw = fs::read_to_string(&path).context(format!("Failed to read snapshot {}", path.display()))?;
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(%key, error = %e, "Ignoring unreadable snapshot");
                Ok(None)
            }
        }
    }

    /// Remove the snapshot stored under `key`, returning whether one existed
    pub fn clear(&self, key: &str) -> Result<bool> {
        debug!(%key, "clear: called");
        let path = self.snapshot_path(key)?;
        if !path.exists() {
            return Ok(false);
        }
        let lock = self.lock()?;
        fs::remove_file(&path).context(format!("Failed to remove snapshot {}", path.display()))?;
        FileExt::unlock(&lock)?;
        info!(%key, "Cleared snapshot");
        Ok(true)
    }

    /// List keys that currently hold a snapshot
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
