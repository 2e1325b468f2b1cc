//! Platform-specific configuration paths.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/specflow/` (Linux), `~/Library/Application Support/specflow/` (macOS), `%APPDATA%\specflow\` (Windows)
//! - **Default file**: `specflow.toml` inside the user config directory
//! - **Named configs**: any other `*.toml` file in the same directory
//!
//! # Example
//!
//! ```rust,no_run
//! use specflow_config::paths;
//!
//! let path = paths::default_config_path();
//! println!("Default config: {:?}", path);
//!
//! if let Some(path) = paths::find_config("studio") {
//!     println!("Found config at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "specflow";

/// File name of the default configuration.
pub const DEFAULT_CONFIG_FILE: &str = "specflow.toml";

/// Returns the user-specific configuration directory.
///
/// # Platform Paths
///
/// - Linux: `~/.config/specflow/`
/// - macOS: `~/Library/Application Support/specflow/`
/// - Windows: `%APPDATA%\specflow\`
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the default configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(DEFAULT_CONFIG_FILE)
}

/// Ensure the user config directory exists.
///
/// Creates the directory if it doesn't exist.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Find a configuration file by path or name.
///
/// The name can be a path to an existing file, or a config name (with or
/// without `.toml`) looked up in the user config directory.
pub fn find_config(name: &str) -> Option<PathBuf> {
    find_config_in(name, &user_config_dir())
}

fn find_config_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

/// List configuration files in the user config directory, sorted by name.
pub fn list_configs() -> Vec<PathBuf> {
    list_configs_in(&user_config_dir())
}

fn list_configs_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut configs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    configs.sort();
    configs
}

/// Config name from a file path (the file stem).
pub fn config_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn user_config_dir_ends_with_app_name() {
        assert!(user_config_dir().ends_with("specflow"));
        assert!(default_config_path().ends_with("specflow/specflow.toml"));
    }

    #[test]
    fn find_by_name_adds_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studio.toml");
        fs::write(&path, "").unwrap();
        assert_eq!(find_config_in("studio", dir.path()), Some(path.clone()));
        assert_eq!(find_config_in("studio.toml", dir.path()), Some(path));
        assert_eq!(find_config_in("missing", dir.path()), None);
    }

    #[test]
    fn find_by_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("elsewhere.toml");
        fs::write(&path, "").unwrap();
        let found = find_config_in(path.to_str().unwrap(), Path::new("/nonexistent/12345"));
        assert_eq!(found, Some(path));
    }

    #[test]
    fn list_only_toml_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.toml"), "").unwrap();
        fs::write(dir.path().join("a.toml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let names: Vec<_> = list_configs_in(dir.path())
            .iter()
            .filter_map(|p| config_name_from_path(p))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        assert!(list_configs_in(Path::new("/nonexistent/path/12345")).is_empty());
    }
}
