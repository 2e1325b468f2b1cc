//! Analyzer configuration file format and operations.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use specflow_analysis::AnalyzerSettings;
use specflow_core::{FrequencyScale, WindowFunction};

use crate::error::ConfigError;
use crate::validation::validate_config;

/// On-disk configuration of one analysis pipeline.
///
/// Every table and field is optional; missing values take the defaults of
/// [`AnalyzerSettings`].
///
/// # TOML Format
///
/// ```toml
/// [capture]
/// sample-rate = 48000
/// channels = 2
///
/// [transform]
/// block-size = 8192
/// move-speed = 8
/// window = "blackman-nuttall"
/// prefill = true
///
/// [display]
/// min-frequency = 50.0
/// max-frequency = 20000.0
/// max-db = 130.0
/// scale = "decade"
/// width = 256
/// history = 512
/// poll-period-ms = 20
/// producer-levels = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzerConfig {
    /// Format of the incoming audio.
    pub capture: CaptureConfig,
    /// Block, hop and window.
    pub transform: TransformConfig,
    /// Post-processing and consumer cadence.
    pub display: DisplayConfig,
}

/// `[capture]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct CaptureConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// `[transform]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransformConfig {
    /// Samples per transform block.
    pub block_size: usize,
    /// Hop divisor, `hop = block-size / move-speed`.
    pub move_speed: usize,
    /// Analysis window.
    pub window: WindowFunction,
    /// Start with one block of silence.
    pub prefill: bool,
}

/// `[display]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Lowest displayed frequency in Hz.
    pub min_frequency: f64,
    /// Highest displayed frequency in Hz.
    pub max_frequency: f64,
    /// Decibel range mapped onto `[0, 1]`.
    pub max_db: f64,
    /// Perceptual frequency axis.
    pub scale: FrequencyScale,
    /// Buckets per displayed column.
    pub width: usize,
    /// Retained columns.
    pub history: usize,
    /// Consumer poll period in milliseconds.
    pub poll_period_ms: u64,
    /// Compute levels on the producer side.
    pub producer_levels: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let settings = AnalyzerSettings::default();
        Self {
            sample_rate: settings.sample_rate,
            channels: settings.channels,
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        let settings = AnalyzerSettings::default();
        Self {
            block_size: settings.block_size,
            move_speed: settings.move_speed,
            window: settings.window,
            prefill: settings.prefill,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let settings = AnalyzerSettings::default();
        Self {
            min_frequency: settings.min_frequency,
            max_frequency: settings.max_frequency,
            max_db: settings.max_db,
            scale: settings.scale,
            width: settings.display_width,
            history: settings.history_capacity,
            poll_period_ms: settings.poll_period.as_millis() as u64,
            producer_levels: settings.producer_levels,
        }
    }
}

impl AnalyzerConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a pretty-printed TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Check every field; see [`validate_config`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(validate_config(self)?)
    }

    /// Validated runtime settings.
    pub fn to_settings(&self) -> Result<AnalyzerSettings, ConfigError> {
        self.validate()?;
        let settings = AnalyzerSettings {
            sample_rate: self.capture.sample_rate,
            channels: self.capture.channels,
            block_size: self.transform.block_size,
            move_speed: self.transform.move_speed,
            window: self.transform.window,
            min_frequency: self.display.min_frequency,
            max_frequency: self.display.max_frequency,
            max_db: self.display.max_db,
            scale: self.display.scale,
            display_width: self.display.width,
            history_capacity: self.display.history,
            poll_period: Duration::from_millis(self.display.poll_period_ms),
            prefill: self.transform.prefill,
            producer_levels: self.display.producer_levels,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Consuming form of [`to_settings`](Self::to_settings).
    pub fn into_settings(self) -> Result<AnalyzerSettings, ConfigError> {
        self.to_settings()
    }
}

impl From<&AnalyzerSettings> for AnalyzerConfig {
    fn from(settings: &AnalyzerSettings) -> Self {
        Self {
            capture: CaptureConfig {
                sample_rate: settings.sample_rate,
                channels: settings.channels,
            },
            transform: TransformConfig {
                block_size: settings.block_size,
                move_speed: settings.move_speed,
                window: settings.window,
                prefill: settings.prefill,
            },
            display: DisplayConfig {
                min_frequency: settings.min_frequency,
                max_frequency: settings.max_frequency,
                max_db: settings.max_db,
                scale: settings.scale,
                width: settings.display_width,
                history: settings.history_capacity,
                poll_period_ms: settings.poll_period.as_millis() as u64,
                producer_levels: settings.producer_levels,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings() {
        let settings = AnalyzerConfig::default().into_settings().unwrap();
        assert_eq!(settings, AnalyzerSettings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config = AnalyzerConfig::from_toml(
            r#"
            [transform]
            block-size = 4096
            window = "hann"

            [display]
            scale = "mel"
            "#,
        )
        .unwrap();
        assert_eq!(config.transform.block_size, 4096);
        assert_eq!(config.transform.window, WindowFunction::Hann);
        assert_eq!(config.transform.move_speed, 8);
        assert_eq!(config.display.scale, FrequencyScale::Mel);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(AnalyzerConfig::from_toml("").unwrap(), AnalyzerConfig::default());
    }

    #[test]
    fn unknown_window_is_a_parse_error() {
        let err = AnalyzerConfig::from_toml("[transform]\nwindow = \"kaiser\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn toml_uses_kebab_case() {
        let text = AnalyzerConfig::default().to_toml().unwrap();
        assert!(text.contains("[capture]"));
        assert!(text.contains("sample-rate = 48000"));
        assert!(text.contains("window = \"blackman-nuttall\""));
        assert!(text.contains("poll-period-ms = 20"));
        assert_eq!(AnalyzerConfig::from_toml(&text).unwrap(), AnalyzerConfig::default());
    }

    #[test]
    fn settings_round_trip_through_config() {
        let settings = AnalyzerSettings {
            block_size: 2048,
            move_speed: 4,
            scale: FrequencyScale::Cochlear,
            poll_period: Duration::from_millis(33),
            ..AnalyzerSettings::default()
        };
        let config = AnalyzerConfig::from(&settings);
        assert_eq!(config.to_settings().unwrap(), settings);
    }

    #[test]
    fn invalid_file_is_rejected_before_settings() {
        let mut config = AnalyzerConfig::default();
        config.display.max_db = 0.0;
        assert!(matches!(config.to_settings(), Err(ConfigError::Validation(_))));
    }
}
