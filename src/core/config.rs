//! Cache configuration resolved once at startup and passed to every component

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{CacheError, CacheResult};
use crate::core::model::{check_command_name, KeyScheme};

/// Directory name under the platform user cache location
pub const APP_DIR: &str = "cclo";

/// Extension of per-command store files
pub const STORE_EXT: &str = "json";

/// Sentinel whose existence means a mutating session is in progress
pub const LOCK_FILE: &str = ".cclo.lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub key_scheme: KeyScheme,
}

impl CacheConfig {
    /// Build a config for an explicit directory without touching the filesystem
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            key_scheme: KeyScheme::default(),
        }
    }

    pub fn with_key_scheme(mut self, key_scheme: KeyScheme) -> Self {
        self.key_scheme = key_scheme;
        self
    }

    /// Resolve the cache directory and make sure it exists.
    ///
    /// `override_dir` wins over `$XDG_CACHE_HOME/cclo` (or the platform
    /// equivalent reported by `dirs::cache_dir`).
    pub fn resolve(override_dir: Option<&Path>) -> CacheResult<Self> {
        let cache_dir = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_cache_dir()?,
        };
        ensure_cache_dir(&cache_dir)?;
        Ok(Self::new(cache_dir))
    }

    /// Path of the store file for a command name; never leaves `cache_dir`
    pub fn store_path(&self, command_name: &str) -> CacheResult<PathBuf> {
        check_command_name(command_name)?;
        Ok(self.cache_dir.join(format!("{}.{}", command_name, STORE_EXT)))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.cache_dir.join(LOCK_FILE)
    }
}

/// Platform user cache directory joined with [`APP_DIR`]
pub fn default_cache_dir() -> CacheResult<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| CacheError::CacheDir {
            path: PathBuf::from(APP_DIR),
            reason: "no user cache directory on this platform".to_string(),
        })
}

/// Create the cache directory (owner-only on unix) if it is missing
pub fn ensure_cache_dir(dir: &Path) -> CacheResult<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(CacheError::CacheDir {
            path: dir.to_path_buf(),
            reason: "exists but is not a directory".to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            create_private_dir(dir).map_err(|e| CacheError::CacheDir {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
        }
        Err(e) => Err(CacheError::CacheDir {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(unix)]
pub(crate) fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
pub(crate) fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_and_lock_paths() {
        let config = CacheConfig::new("/cache/cclo");
        assert_eq!(
            config.store_path("echo").unwrap(),
            PathBuf::from("/cache/cclo/echo.json")
        );
        assert!(config.store_path("../echo").is_err());
        assert!(config.store_path(".cclo").is_err());
        assert_eq!(config.lock_path(), PathBuf::from("/cache/cclo/.cclo.lock"));
        assert_eq!(config.key_scheme, KeyScheme::Joined);
    }

    #[test]
    fn test_resolve_creates_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("nested").join("cclo");

        let config = CacheConfig::resolve(Some(&dir)).unwrap();
        assert_eq!(config.cache_dir, dir);
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_creates_owner_only_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let dir = temp.path().join("cclo");
        CacheConfig::resolve(Some(&dir)).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_resolve_rejects_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("cclo");
        fs::write(&file, "not a dir").unwrap();

        let err = CacheConfig::resolve(Some(&file)).unwrap_err();
        assert!(matches!(err, CacheError::CacheDir { .. }));
    }

    #[test]
    fn test_resolve_existing_directory() {
        let temp = tempdir().unwrap();
        let config = CacheConfig::resolve(Some(temp.path())).unwrap();
        assert_eq!(config.cache_dir, temp.path());
    }

    #[test]
    fn test_default_cache_dir_ends_with_app_dir() {
        if let Ok(dir) = default_cache_dir() {
            assert!(dir.ends_with(APP_DIR));
        }
    }
}
