//! Platform-specific paths for study files and the result cache.
//!
//! # Directory Structure
//!
//! - **Cache**: `~/.cache/acoubeam/` (Linux), `~/Library/Caches/acoubeam/` (macOS), `%LOCALAPPDATA%\acoubeam\` (Windows)
//! - **Studies**: `~/.config/acoubeam/studies/` (Linux), `~/Library/Application Support/acoubeam/studies/` (macOS), `%APPDATA%\acoubeam\studies\` (Windows)
//!
//! # Example
//!
//! ```rust,no_run
//! use acoubeam_config::paths;
//!
//! let cache = paths::ensure_cache_dir().unwrap();
//! println!("Results cached in {:?}", cache);
//!
//! if let Some(path) = paths::find_study("wind_tunnel") {
//!     println!("Found study at: {:?}", path);
//! }
//! ```

use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "acoubeam";

/// Subdirectory name for studies.
const STUDIES_SUBDIR: &str = "studies";

/// Returns the default directory for persisted results.
///
/// Falls back to `./acoubeam` if the platform cache directory cannot be
/// determined.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific studies directory.
pub fn user_studies_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(STUDIES_SUBDIR)
}

/// Find a study file by name.
///
/// `name` may be a path to an existing file, or a study name (with or
/// without `.toml`) looked up in [`user_studies_dir`].
pub fn find_study(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{}.toml", name)
    };
    let user_path = user_studies_dir().join(filename);
    user_path.is_file().then_some(user_path)
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
        tracing::debug!(dir = %dir.display(), "created directory");
    }
    Ok(dir.to_path_buf())
}

/// Ensure the default cache directory exists.
pub fn ensure_cache_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(&default_cache_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_cache_dir_is_namespaced() {
        let dir = default_cache_dir();
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn studies_dir_is_namespaced() {
        let dir = user_studies_dir();
        assert!(dir.ends_with(Path::new(APP_NAME).join(STUDIES_SUBDIR)));
    }

    #[test]
    fn find_study_by_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tunnel.toml");
        fs::write(&path, "").unwrap();

        assert_eq!(find_study(path.to_str().unwrap()), Some(path));
    }

    #[test]
    fn find_study_not_found() {
        assert!(find_study("nonexistent_study_12345").is_none());
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        assert_eq!(ensure_dir(&dir).unwrap(), dir);
        assert!(dir.is_dir());
        // second call is a no-op
        assert!(ensure_dir(&dir).is_ok());
    }

    #[test]
    fn ensure_dir_reports_file_in_the_way() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("taken");
        fs::write(&file, "").unwrap();
        let err = ensure_dir(&file.join("sub")).unwrap_err();
        assert!(matches!(err, ConfigError::CreateDir { .. }));
    }
}
