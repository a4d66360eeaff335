//! Session lock serializing cache-mutating runs
//!
//! The file lock is a sentinel created with exclusive-create semantics: its
//! existence is the lock. It is never cleared automatically, so a session that
//! died holding it stays visible until the user removes the file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::error::{CacheError, CacheResult};

/// Something that admits one mutating session at a time
pub trait ProcessMutex {
    type Guard: LockGuard;

    /// Take the lock or fail with `AlreadyLocked` without waiting
    fn acquire(&self) -> CacheResult<Self::Guard>;
}

/// Proof of a held lock
pub trait LockGuard {
    fn release(self) -> CacheResult<()>;
}

/// Lock shared by every process using the same cache directory
#[derive(Debug, Clone)]
pub struct FileMutex {
    path: PathBuf,
}

impl FileMutex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProcessMutex for FileMutex {
    type Guard = FileLockGuard;

    fn acquire(&self) -> CacheResult<FileLockGuard> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(CacheError::AlreadyLocked {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(CacheError::LockIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // Contents are informational only
        let _ = writeln!(file, "{}", std::process::id());
        debug!(path = %self.path.display(), "lock acquired");

        Ok(FileLockGuard {
            path: self.path.clone(),
            released: false,
        })
    }
}

/// Held file lock; removes the sentinel on `release`
#[derive(Debug)]
pub struct FileLockGuard {
    path: PathBuf,
    released: bool,
}

impl FileLockGuard {
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LockGuard for FileLockGuard {
    fn release(mut self) -> CacheResult<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|source| CacheError::LockRelease {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "lock released");
        Ok(())
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // Only reached when unwinding past a session that never released
        if !self.released {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
            }
        }
    }
}

/// In-process lock with the same contract as [`FileMutex`]
#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub struct MemoryMutex {
    held: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MemoryMutex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl ProcessMutex for MemoryMutex {
    type Guard = MemoryLockGuard;

    fn acquire(&self) -> CacheResult<MemoryLockGuard> {
        self.held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CacheError::AlreadyLocked {
                path: PathBuf::from("<memory>"),
            })?;
        Ok(MemoryLockGuard {
            held: Arc::clone(&self.held),
        })
    }
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct MemoryLockGuard {
    held: Arc<AtomicBool>,
}

impl LockGuard for MemoryLockGuard {
    fn release(self) -> CacheResult<()> {
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }
}
