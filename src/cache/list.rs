//! Read-only views over the cache directory
//!
//! Listing never takes the session lock; it reads whatever is on disk.

use std::fs;
use std::io;
use std::path::Path;

use crate::cache::store::CacheStore;
use crate::core::config::{CacheConfig, STORE_EXT};
use crate::core::error::{CacheError, CacheResult};
use crate::core::model::EntrySummary;

/// Names of all commands with a store file, sorted
pub fn list_command_names(config: &CacheConfig) -> CacheResult<Vec<String>> {
    let entries = match fs::read_dir(&config.cache_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CacheError::StoreRead {
                path: config.cache_dir.clone(),
                source,
            })
        }
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CacheError::StoreRead {
            path: config.cache_dir.clone(),
            source,
        })?;
        if let Some(name) = command_name_of(&entry.path()) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Store files are visible `<name>.json` files; dot files are temp files or the lock
fn command_name_of(path: &Path) -> Option<String> {
    if path.extension()? != STORE_EXT {
        return None;
    }
    let name = path.file_stem()?.to_string_lossy().into_owned();
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name)
}

/// Every cached run of `command_name`, oldest first
pub fn list_entries(config: &CacheConfig, command_name: &str) -> CacheResult<Vec<EntrySummary>> {
    let store = CacheStore::new(config.clone()).load(command_name)?;

    let mut entries: Vec<(String, EntrySummary)> = store
        .caches
        .into_iter()
        .map(|(key, record)| {
            let summary = EntrySummary {
                date: record.date,
                args: record.args,
            };
            (key, summary)
        })
        .collect();
    entries.sort_by(|(ka, a), (kb, b)| a.date.cmp(&b.date).then_with(|| ka.cmp(kb)));

    Ok(entries.into_iter().map(|(_, summary)| summary).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CacheRecord, CommandStore, Invocation};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn persist(config: &CacheConfig, cmd: &str, runs: &[(&[&str], i64)]) {
        let cache = CacheStore::new(config.clone());
        let mut store = CommandStore::empty(cmd);
        for (elements, secs) in runs {
            let invocation = Invocation::new(elements.iter().copied()).unwrap();
            let date = Utc.timestamp_opt(*secs, 0).unwrap();
            store.upsert(
                elements.join(" "),
                CacheRecord::new(&invocation, date, b"x".to_vec()),
            );
        }
        cache.persist(&store).unwrap();
    }

    #[test]
    fn test_list_command_names_sorted() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path());
        persist(&config, "ls", &[]);
        persist(&config, "date", &[]);
        persist(&config, "echo", &[]);

        assert_eq!(
            list_command_names(&config).unwrap(),
            vec!["date", "echo", "ls"]
        );
    }

    #[test]
    fn test_list_command_names_skips_non_stores() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path());
        persist(&config, "echo", &[]);
        fs::write(config.lock_path(), "1").unwrap();
        fs::write(temp.path().join(".echo.json.42.tmp"), "{").unwrap();
        fs::write(temp.path().join(".hidden.json"), "{}").unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();

        assert_eq!(list_command_names(&config).unwrap(), vec!["echo"]);
    }

    #[test]
    fn test_list_command_names_missing_dir() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path().join("absent"));
        assert!(list_command_names(&config).unwrap().is_empty());
    }

    #[test]
    fn test_list_entries_oldest_first() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path());
        persist(
            &config,
            "sleep",
            &[(&["sleep", "2"], 200), (&["sleep", "1"], 100), (&["sleep", "3"], 300)],
        );

        let entries = list_entries(&config, "sleep").unwrap();
        let args: Vec<String> = entries.iter().map(|e| e.args.join(" ")).collect();
        assert_eq!(args, vec!["sleep 1", "sleep 2", "sleep 3"]);
        assert_eq!(entries[0].date, Utc.timestamp_opt(100, 0).unwrap());
    }

    #[test]
    fn test_list_entries_unknown_command() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path());
        assert!(list_entries(&config, "nothing").unwrap().is_empty());
    }

    #[test]
    fn test_list_entries_rejects_path_like_name() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path().join("cclo"));
        persist(&CacheConfig::new(temp.path()), "outside", &[(&["outside"], 1)]);

        let err = list_entries(&config, "../outside").unwrap_err();
        assert!(matches!(err, CacheError::InvalidInvocation(_)));
        assert!(list_entries(&config, ".cclo").is_err());
    }

    #[test]
    fn test_list_entries_malformed() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::new(temp.path());
        fs::write(config.store_path("echo").unwrap(), "[]").unwrap();

        let err = list_entries(&config, "echo").unwrap_err();
        assert!(matches!(err, CacheError::MalformedStore { .. }));
    }
}
