//! Cache store - load and persist one command's cache file

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::codec;
use crate::core::config::{create_private_dir, CacheConfig};
use crate::core::error::{CacheError, CacheResult};
use crate::core::model::{CacheRecord, CommandStore};

/// On-disk access to per-command stores under one cache directory.
///
/// Nothing is kept in memory between calls: every `load` reads the file again.
#[derive(Debug, Clone)]
pub struct CacheStore {
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn path_for(&self, command_name: &str) -> CacheResult<PathBuf> {
        self.config.store_path(command_name)
    }

    /// Load the store for `command_name`; a missing file yields an empty store.
    ///
    /// The loaded store always carries `command_name`, whatever `cmd` the file
    /// claims, so a later `persist` writes back to the file that was read.
    pub fn load(&self, command_name: &str) -> CacheResult<CommandStore> {
        let path = self.path_for(command_name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(command = command_name, "no cache file yet");
                return Ok(CommandStore::empty(command_name));
            }
            Err(source) => return Err(CacheError::StoreRead { path, source }),
        };

        let mut store: CommandStore = codec::decode(&bytes).map_err(|source| {
            CacheError::MalformedStore {
                path: path.clone(),
                source,
            }
        })?;
        if store.cmd != command_name {
            warn!(
                path = %path.display(),
                found = %store.cmd,
                "cache file names another command; using the file name"
            );
            store.cmd = command_name.to_string();
        }
        debug!(command = command_name, entries = store.len(), "loaded cache file");
        Ok(store)
    }

    pub fn lookup<'a>(&self, store: &'a CommandStore, key: &str) -> Option<&'a CacheRecord> {
        store.lookup(key)
    }

    pub fn upsert(&self, store: &mut CommandStore, key: impl Into<String>, record: CacheRecord) {
        store.upsert(key, record);
    }

    /// Write the store with write-then-rename so readers never see a torn file.
    ///
    /// On failure the previous file, if any, is left as it was.
    pub fn persist(&self, store: &CommandStore) -> CacheResult<()> {
        let path = self.path_for(&store.cmd)?;
        let write_err = |source: io::Error| CacheError::StoreWrite {
            path: path.clone(),
            source,
        };

        create_private_dir(&self.config.cache_dir).map_err(write_err)?;
        let bytes = codec::encode(store).map_err(|e| write_err(io::Error::other(e)))?;

        let temp_path = temp_path_for(&path);
        if let Err(e) = write_synced(&temp_path, &bytes).and_then(|_| fs::rename(&temp_path, &path))
        {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }

        debug!(path = %path.display(), entries = store.len(), "persisted cache file");
        Ok(())
    }
}

/// Hidden sibling of `path`, unique per process
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = open_private(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
