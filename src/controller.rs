//! Cache controller - serve from cache or run, capture and store

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::cache::lock::{FileMutex, LockGuard, ProcessMutex};
use crate::cache::store::CacheStore;
use crate::core::config::CacheConfig;
use crate::core::error::{CacheError, CacheResult, ExecutionFailure};
use crate::core::model::{CacheRecord, Invocation};
use crate::exec::{Executor, ProcessTee, Streams};

/// How a successful session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Replayed a stored payload without spawning anything
    Served,
    /// Ran the command and stored its output
    Stored,
}

/// Orchestrates one lookup-or-execute-and-store session
pub struct Controller<M, E> {
    store: CacheStore,
    mutex: M,
    executor: E,
    clock: fn() -> DateTime<Utc>,
}

impl Controller<FileMutex, ProcessTee> {
    /// Controller wired to the real filesystem lock and child processes
    pub fn system(config: CacheConfig) -> Self {
        let mutex = FileMutex::new(config.lock_path());
        Self::new(CacheStore::new(config), mutex, ProcessTee::new())
    }
}

impl<M: ProcessMutex, E: Executor> Controller<M, E> {
    pub fn new(store: CacheStore, mutex: M, executor: E) -> Self {
        Self {
            store,
            mutex,
            executor,
            clock: Utc::now,
        }
    }

    /// Replace the timestamp source for new records
    #[allow(dead_code)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    #[allow(dead_code)]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Serve `invocation` from cache, or run it and cache its stdout.
    ///
    /// `force` skips the lookup and always runs. The session lock is released
    /// on every path once acquired; a release failure is logged and never
    /// replaces the session's own result.
    pub fn run_cached(
        &self,
        invocation: &[String],
        force: bool,
        streams: &mut Streams<'_>,
    ) -> CacheResult<RunOutcome> {
        let invocation = Invocation::new(invocation.iter().cloned())?;

        let guard = self.mutex.acquire()?;
        let result = self.locked_session(&invocation, force, streams);

        if let Err(e) = guard.release() {
            error!(error = %e, "failed to release cache lock");
        }
        result
    }

    fn locked_session(
        &self,
        invocation: &Invocation,
        force: bool,
        streams: &mut Streams<'_>,
    ) -> CacheResult<RunOutcome> {
        let command_name = invocation.command_name()?;
        let mut store = self.store.load(&command_name)?;
        let key = invocation.cache_key(self.store.config().key_scheme);

        if !force {
            if let Some(record) = self.store.lookup(&store, &key) {
                debug!(key = %key, bytes = record.output.len(), "cache hit");
                streams
                    .stdout
                    .write_all(&record.output)
                    .and_then(|_| streams.stdout.flush())
                    .map_err(|e| {
                        CacheError::execution(invocation.program(), ExecutionFailure::Stream(e))
                    })?;
                return Ok(RunOutcome::Served);
            }
            debug!(key = %key, "cache miss");
        } else {
            debug!(key = %key, "forced run");
        }

        let output = self.executor.run(invocation, streams)?;
        let record = CacheRecord::new(invocation, (self.clock)(), output);
        self.store.upsert(&mut store, key.clone(), record);
        self.store.persist(&store)?;

        info!(command = %command_name, key = %key, "cached output");
        Ok(RunOutcome::Stored)
    }
}
