//! Configuration files for specflow analyzers.
//!
//! TOML files with `[capture]`, `[transform]` and `[display]` tables are
//! parsed into [`AnalyzerConfig`], validated field by field, and converted
//! into the analysis crate's [`AnalyzerSettings`](specflow_analysis::AnalyzerSettings).
//!
//! # Example
//!
//! ```rust
//! use specflow_config::AnalyzerConfig;
//!
//! let config = AnalyzerConfig::from_toml(
//!     r#"
//!     [transform]
//!     block-size = 4096
//!     move-speed = 4
//!
//!     [display]
//!     scale = "octave"
//!     "#,
//! )
//! .unwrap();
//! let settings = config.into_settings().unwrap();
//! assert_eq!(settings.hop_size(), 1024);
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Field-level validation.
pub mod validation;

pub use config::{AnalyzerConfig, CaptureConfig, DisplayConfig, TransformConfig};
pub use error::ConfigError;
pub use paths::{
    DEFAULT_CONFIG_FILE, config_name_from_path, default_config_path, ensure_user_config_dir,
    find_config, list_configs, user_config_dir,
};
pub use validation::{ValidationError, ValidationResult, validate_config};
