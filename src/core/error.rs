//! Error taxonomy shared by every cache component

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the cache engine
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by the cache engine.
///
/// Every variant is returned to the immediate caller. The only error that is
/// ever swallowed is `LockRelease`, which the controller logs instead of
/// letting it replace the session result.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error(
        "cache is locked by another cclo session: {}\n\
         if no other cclo is running, a previous run died holding the lock; remove the file to recover",
        .path.display()
    )]
    AlreadyLocked { path: PathBuf },

    #[error("failed to create lock file {}: {source}", .path.display())]
    LockIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove lock file {}: {source}", .path.display())]
    LockRelease {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed cache file {}: {source}", .path.display())]
    MalformedStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read cache file {}: {source}", .path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write cache file {}: {source}", .path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program}: {cause}")]
    Execution {
        program: String,
        #[source]
        cause: ExecutionFailure,
    },

    #[error("cache directory {}: {reason}", .path.display())]
    CacheDir { path: PathBuf, reason: String },
}

/// Why a child process did not produce a cacheable result
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("failed to start: {0}")]
    Spawn(#[source] io::Error),

    /// `None` when the child was terminated by a signal
    #[error("{}", exit_message(.code))]
    Exit { code: Option<i32> },

    #[error("failed to relay output: {0}")]
    Stream(#[source] io::Error),
}

fn exit_message(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl CacheError {
    pub fn execution(program: impl Into<String>, cause: ExecutionFailure) -> Self {
        Self::Execution {
            program: program.into(),
            cause,
        }
    }

    /// True for lock contention
    #[allow(dead_code)]
    pub fn is_already_locked(&self) -> bool {
        matches!(self, Self::AlreadyLocked { .. })
    }
}
