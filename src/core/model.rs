//! Data model - invocations, cache keys, records and per-command stores

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{CacheError, CacheResult};

/// A command line: the executable path followed by its arguments.
///
/// Never empty; construction goes through [`Invocation::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    elements: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(elements: I) -> CacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let elements: Vec<String> = elements.into_iter().map(Into::into).collect();
        if elements.is_empty() {
            return Err(CacheError::InvalidInvocation(
                "command not specified".to_string(),
            ));
        }
        let invocation = Self { elements };
        // Validate eagerly so a store name always exists
        invocation.command_name()?;
        Ok(invocation)
    }

    /// Executable path as given by the caller
    pub fn program(&self) -> &str {
        &self.elements[0]
    }

    pub fn args(&self) -> &[String] {
        &self.elements[1..]
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Base name of the executable; names the per-command store file
    pub fn command_name(&self) -> CacheResult<String> {
        let name = Path::new(self.program())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CacheError::InvalidInvocation(format!(
                    "cannot derive a command name from {:?}",
                    self.program()
                ))
            })?;
        check_command_name(&name)?;
        Ok(name)
    }

    /// Derive the cache key under the given scheme
    pub fn cache_key(&self, scheme: KeyScheme) -> String {
        match scheme {
            KeyScheme::Joined => self.elements.join(" "),
            KeyScheme::Structured => {
                serde_json::to_string(&self.elements).unwrap_or_else(|_| self.elements.join(" "))
            }
        }
    }
}

/// A command name must be a plain, visible file stem inside the cache directory.
///
/// Hidden names would collide with the lock and temp files and never be listed.
pub fn check_command_name(name: &str) -> CacheResult<()> {
    if name.is_empty() || name.starts_with('.') || name.chars().any(std::path::is_separator) {
        return Err(CacheError::InvalidInvocation(format!(
            "{:?} is not a usable command name",
            name
        )));
    }
    Ok(())
}

/// How an invocation is turned into a cache key.
///
/// `Joined` separates elements with a single space. `["echo", "a b"]` and
/// `["echo", "a", "b"]` share the key `echo a b`; this imprecision is accepted.
/// `Structured` encodes the elements as a JSON array and has no such collisions,
/// but its keys never match entries written under `Joined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyScheme {
    #[default]
    Joined,
    Structured,
}

/// One cached run of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// `["cmdpath", "arg1", "arg2", ...]`
    #[serde(rename = "Args")]
    pub args: Vec<String>,

    /// Creation time
    pub date: DateTime<Utc>,

    /// Captured standard output
    #[serde(with = "crate::cache::codec::base64_bytes")]
    pub output: Vec<u8>,
}

impl CacheRecord {
    pub fn new(invocation: &Invocation, date: DateTime<Utc>, output: Vec<u8>) -> Self {
        Self {
            args: invocation.elements().to_vec(),
            date,
            output,
        }
    }
}

/// All cached runs of one command, persisted as `<cmd>.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStore {
    /// Command name (base name of the executable)
    pub cmd: String,

    /// Cache key -> record
    #[serde(default)]
    pub caches: BTreeMap<String, CacheRecord>,
}

impl CommandStore {
    pub fn empty(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            caches: BTreeMap::new(),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&CacheRecord> {
        self.caches.get(key)
    }

    /// Insert or fully replace the record stored under `key`
    pub fn upsert(&mut self, key: impl Into<String>, record: CacheRecord) {
        self.caches.insert(key.into(), record);
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

/// What a listing shows for one cached run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub date: DateTime<Utc>,
    pub args: Vec<String>,
}
