//! File-backed store.

use crate::backend::QueueStore;
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A file-backed store.
///
/// All entries live in a single JSON object. Every `set`/`remove` rewrites
/// the file through a temporary sibling followed by an atomic rename, so a
/// crash mid-write leaves either the old or the new contents, never a torn
/// file.
///
/// The engine state this holds is small (a pending-operation queue, a
/// conflict list, a timestamp), so rewrite-on-mutate is cheap and keeps the
/// on-disk form inspectable with ordinary tools.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Guards both the cached map and the file write sequence.
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens a store at `path`, creating parent directories as needed.
    ///
    /// An unreadable or corrupt file is logged and treated as empty; the
    /// next successful write replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    warn!("store file {:?} is corrupt, starting empty: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("store file {:?} is unreadable, starting empty: {}", path, e);
                BTreeMap::new()
            }
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_locked(&self, data: &BTreeMap<String, String>) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(text.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl QueueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut data = self.data.lock();
        data.insert(key.to_string(), value.to_string());
        self.write_locked(&data)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut data = self.data.lock();
        if data.remove(key).is_none() {
            return Ok(());
        }
        self.write_locked(&data)
    }
}
