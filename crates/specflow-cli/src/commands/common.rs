//! Shared helpers for CLI commands.

use anyhow::Context;
use specflow_config::{AnalyzerConfig, ConfigError, default_config_path, find_config};

/// Loads the named configuration, or the default file when `name` is
/// `None` (falling back to built-in defaults if that file is absent).
pub fn load_config(name: Option<&str>) -> anyhow::Result<AnalyzerConfig> {
    match name {
        Some(name) => {
            let path = find_config(name).ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
            AnalyzerConfig::load(&path)
                .with_context(|| format!("loading configuration {}", path.display()))
        }
        None => {
            let path = default_config_path();
            AnalyzerConfig::load_or_default(&path)
                .with_context(|| format!("loading configuration {}", path.display()))
        }
    }
}
