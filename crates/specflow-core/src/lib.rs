//! Specflow Core - leaf primitives for spectrum analysis
//!
//! Everything here is pure computation: no threads, no I/O, no allocation
//! after construction.
//!
//! # Modules
//!
//! - [`window`] - [`WindowFunction`] and precomputed [`WindowCoefficients`]
//!   with a cached normalization scale
//! - [`scale`] - [`FrequencyScale`], forward/inverse perceptual frequency axes
//! - [`fast_math`] - table-driven logarithm and bit-trick square roots for
//!   per-bin display loops
//! - [`error`] - [`CoreError`]
//!
//! # Features
//!
//! - `serde` - derive `Serialize`/`Deserialize` for [`WindowFunction`] and
//!   [`FrequencyScale`] (kebab-case names)
//!
//! # Example
//!
//! ```
//! use specflow_core::{FrequencyScale, WindowCoefficients, WindowFunction};
//!
//! let window = WindowCoefficients::new(WindowFunction::BlackmanNuttall, 4096);
//! assert!(window.scale() > 0.0);
//!
//! let decade = FrequencyScale::Decade;
//! let mid = decade.from_perceptual((decade.to_perceptual(50.0) + decade.to_perceptual(20_000.0)) / 2.0);
//! assert!((mid - 1000.0).abs() < 1.0);
//! ```

pub mod error;
pub mod fast_math;
pub mod scale;
pub mod window;

pub use error::CoreError;
pub use fast_math::{fast_ln, fast_log2, fast_log10, fast_pow, fast_sqrt, fast_sqrtf};
pub use scale::FrequencyScale;
pub use window::{WindowCoefficients, WindowFunction};
