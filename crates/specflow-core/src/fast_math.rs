//! Fast mathematical approximations for per-bin hot loops.
//!
//! Spectral post-processing evaluates a logarithm for every bin of every
//! frame on both channels. These functions trade a bounded error for
//! throughput in those loops. Each function documents its maximum error and
//! valid input range.
//!
//! # When to use
//!
//! | Function | Replaces | Use case | Max error |
//! |----------|----------|----------|-----------|
//! | [`fast_log2`] | `f64::log2` | Decibel compression | < 1e-4 absolute |
//! | [`fast_ln`] | `f64::ln` | Decibel compression | < 7e-5 absolute |
//! | [`fast_log10`] | `f64::log10` | Decade axes | < 3e-5 absolute |
//! | [`fast_sqrt`] | `f64::sqrt` | Magnitudes for display | < 0.1% relative |
//! | [`fast_sqrtf`] | `f32::sqrt` | Magnitudes for display | < 0.1% relative |
//! | [`fast_pow`] | `f64::powf` | Gamma-like display curves | < 0.05% relative (small `y`) |
//!
//! # When NOT to use
//!
//! Anything that feeds back into the transform, window normalization, or
//! bucket boundaries. Those use exact `std` math; only values headed for the
//! screen go through these approximations.
//!
//! # Table
//!
//! [`fast_log2`] reads a 2^14-entry table of `log2(1 + i / 2^14)` built on
//! first use (128 KiB, shared process-wide).

use std::sync::LazyLock;

/// `log2(e)`.
pub const LOG2_E: f64 = std::f64::consts::LOG2_E;

/// `log2(10)`.
pub const LOG2_10: f64 = std::f64::consts::LOG2_10;

/// Mantissa bits used to index the log table.
const LOG_TABLE_BITS: u32 = 14;

/// Number of entries in the log table.
const LOG_TABLE_LEN: usize = 1 << LOG_TABLE_BITS;

/// IEEE 754 double mantissa width.
const F64_MANTISSA_BITS: u32 = 52;

/// IEEE 754 double exponent bias.
const F64_EXPONENT_BIAS: i64 = 0x3ff;

static LOG_TABLE: LazyLock<Box<[f64]>> = LazyLock::new(|| {
    (0..LOG_TABLE_LEN)
        .map(|i| (1.0 + i as f64 / LOG_TABLE_LEN as f64).log2())
        .collect()
});

/// Forces construction of the log table.
///
/// The table is otherwise built lazily by the first [`fast_log2`] call,
/// which would land on the audio callback thread.
pub fn warm_up() {
    LazyLock::force(&LOG_TABLE);
}

/// Fast base-2 logarithm via exponent extraction and a mantissa lookup.
///
/// The unbiased exponent comes straight from the bit pattern; the top 14
/// mantissa bits index a table of `log2(1 + m)`. The table entry is the value
/// at the lower edge of the mantissa cell, so the result never exceeds the
/// exact logarithm.
///
/// # Accuracy
///
/// Maximum absolute error: `1 / (2^14 · ln 2)` ≈ 8.8e-5 for normal positive
/// `x`. In dB context (`× 20/log₂(10)`): < 6e-4 dB.
///
/// # Arguments
///
/// * `x` - Input value. Must be positive and normal. The sign bit is
///   ignored; `0.0` maps to `-1023.0`, which downstream decibel clamping
///   treats as silence.
///
/// # Examples
///
/// ```
/// use specflow_core::fast_math::fast_log2;
///
/// assert!((fast_log2(1.0) - 0.0).abs() < 1e-4);
/// assert!((fast_log2(8.0) - 3.0).abs() < 1e-4);
/// assert!((fast_log2(0.1) - 0.1f64.log2()).abs() < 1e-4);
/// ```
#[inline]
pub fn fast_log2(x: f64) -> f64 {
    let bits = x.to_bits();
    let exponent = ((bits >> F64_MANTISSA_BITS) & 0x7ff) as i64 - F64_EXPONENT_BIAS;
    let index = ((bits >> (F64_MANTISSA_BITS - LOG_TABLE_BITS)) as usize) & (LOG_TABLE_LEN - 1);
    LOG_TABLE[index] + exponent as f64
}

/// Fast natural logarithm, `fast_log2(x) / log2(e)`.
#[inline]
pub fn fast_ln(x: f64) -> f64 {
    fast_log2(x) / LOG2_E
}

/// Fast base-10 logarithm, `fast_log2(x) / log2(10)`.
#[inline]
pub fn fast_log10(x: f64) -> f64 {
    fast_log2(x) / LOG2_10
}

/// Fast square root: halved-exponent bit trick refined by one Heron step.
///
/// # Accuracy
///
/// Maximum relative error: < 0.1% for positive normal `x`.
///
/// # Examples
///
/// ```
/// use specflow_core::fast_math::fast_sqrt;
///
/// assert!((fast_sqrt(4.0) - 2.0).abs() < 2e-3);
/// assert!((fast_sqrt(1e6) - 1e3).abs() < 1.0);
/// ```
#[inline]
pub fn fast_sqrt(x: f64) -> f64 {
    let estimate = f64::from_bits((x.to_bits() >> 1) + 0x1ff7_a3be_9bb1_a200);
    (estimate + x / estimate) * 0.5
}

/// Single-precision [`fast_sqrt`].
#[inline]
pub fn fast_sqrtf(x: f32) -> f32 {
    let estimate = f32::from_bits((x.to_bits() >> 1) + 0x1fbd_1df4);
    (estimate + x / estimate) * 0.5
}

/// Fast power, `exp(y · ln x)` with the logarithm from [`fast_log2`].
///
/// The exponential is exact, so the relative error is `|y| · 6e-5` at most.
/// `x` must be positive.
#[inline]
pub fn fast_pow(x: f64, y: f64) -> f64 {
    (y * fast_ln(x)).exp()
}
