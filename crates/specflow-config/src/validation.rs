//! Field-level validation of configuration files.
//!
//! [`validate_config`] checks every field and reports all problems at once,
//! so a user fixing a hand-edited file sees the whole list.

use specflow_core::FrequencyScale;
use thiserror::Error;

use crate::config::AnalyzerConfig;

/// Highest sample rate accepted from a file.
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Largest accepted transform block.
pub const MAX_BLOCK_SIZE: usize = 1 << 20;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric field outside its accepted range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field name, e.g. `transform.block-size`.
        field: &'static str,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Frequency bounds not ordered, or not representable on the scale.
    #[error("frequency range {min}..{max} Hz is invalid for the {scale} scale")]
    FrequencyRange {
        /// Lower bound in Hz.
        min: f64,
        /// Upper bound in Hz.
        max: f64,
        /// Selected display scale.
        scale: FrequencyScale,
    },

    /// Hop divisor that does not leave at least one sample per hop.
    #[error("move speed {move_speed} leaves no samples per hop for block size {block_size}")]
    MoveSpeed {
        /// Hop divisor.
        move_speed: usize,
        /// Block size it divides.
        block_size: usize,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_range(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) {
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
}

/// Checks every field of `config`.
///
/// A single problem is returned as-is; several are wrapped in
/// [`ValidationError::Multiple`].
pub fn validate_config(config: &AnalyzerConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let (capture, transform, display) = (&config.capture, &config.transform, &config.display);

    check_range(
        &mut errors,
        "capture.sample-rate",
        f64::from(capture.sample_rate),
        1.0,
        f64::from(MAX_SAMPLE_RATE),
    );
    check_range(&mut errors, "capture.channels", f64::from(capture.channels), 1.0, 2.0);
    check_range(
        &mut errors,
        "transform.block-size",
        transform.block_size as f64,
        2.0,
        MAX_BLOCK_SIZE as f64,
    );
    if transform.move_speed == 0 || transform.move_speed > transform.block_size {
        errors.push(ValidationError::MoveSpeed {
            move_speed: transform.move_speed,
            block_size: transform.block_size,
        });
    }

    let nyquist = f64::from(capture.sample_rate) / 2.0;
    let (min, max) = (display.min_frequency, display.max_frequency);
    let ordered = min.is_finite() && max.is_finite() && min >= 0.0 && min < max && max <= nyquist;
    if !ordered || (display.scale.requires_positive() && min <= 0.0) {
        errors.push(ValidationError::FrequencyRange {
            min,
            max,
            scale: display.scale,
        });
    }
    check_range(&mut errors, "display.max-db", display.max_db, 1.0, 400.0);
    check_range(&mut errors, "display.width", display.width as f64, 1.0, 16_384.0);
    check_range(&mut errors, "display.history", display.history as f64, 1.0, 65_536.0);
    check_range(
        &mut errors,
        "display.poll-period-ms",
        display.poll_period_ms as f64,
        1.0,
        10_000.0,
    );

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
