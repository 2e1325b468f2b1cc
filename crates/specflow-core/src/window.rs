//! Window functions and precomputed coefficient tables.
//!
//! A [`WindowFunction`] names a symmetric cosine-sum window; a
//! [`WindowCoefficients`] table holds its weights for one block size together
//! with the normalization scale used for single-sided magnitude correction.
//!
//! All windows use the symmetric definition with an `N - 1` denominator, so
//! the first and last weights are equal.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::CoreError;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum WindowFunction {
    /// Rectangular; behaves as "no window".
    Rectangular,
    /// Hann window (raised cosine).
    Hann,
    /// Hamming window.
    Hamming,
    /// Classic three-term Blackman window.
    Blackman,
    /// Four-term Blackman-Harris window (-92 dB sidelobes).
    BlackmanHarris,
    /// Four-term Blackman-Nuttall window (-98 dB sidelobes).
    #[default]
    BlackmanNuttall,
}

impl WindowFunction {
    /// Every window, in display order.
    pub const ALL: [Self; 6] = [
        Self::Rectangular,
        Self::Hann,
        Self::Hamming,
        Self::Blackman,
        Self::BlackmanHarris,
        Self::BlackmanNuttall,
    ];

    /// Kebab-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Rectangular => "rectangular",
            Self::Hann => "hann",
            Self::Hamming => "hamming",
            Self::Blackman => "blackman",
            Self::BlackmanHarris => "blackman-harris",
            Self::BlackmanNuttall => "blackman-nuttall",
        }
    }

    /// Cosine-sum terms `a0, a1, ...` for `w(n) = Σ (-1)^k a_k cos(2πkn/(N-1))`.
    fn terms(self) -> &'static [f64] {
        match self {
            Self::Rectangular => &[1.0],
            Self::Hann => &[0.5, 0.5],
            Self::Hamming => &[0.54, 0.46],
            Self::Blackman => &[0.42, 0.5, 0.08],
            Self::BlackmanHarris => &[0.35875, 0.48829, 0.14128, 0.01168],
            Self::BlackmanNuttall => &[0.363_581_9, 0.489_177_5, 0.136_599_5, 0.010_641_1],
        }
    }

    /// Returns `true` when applying this window leaves samples untouched.
    pub fn is_identity(self) -> bool {
        self == Self::Rectangular
    }

    /// Computes `size` weights for this window.
    ///
    /// A single-sample window is `[1.0]`; an empty window is empty.
    pub fn coefficients(self, size: usize) -> Vec<f64> {
        if size < 2 {
            return vec![1.0; size];
        }
        let terms = self.terms();
        let denominator = (size - 1) as f64;
        (0..size)
            .map(|n| {
                let x = 2.0 * PI * n as f64 / denominator;
                terms
                    .iter()
                    .enumerate()
                    .map(|(k, a)| {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        sign * a * (k as f64 * x).cos()
                    })
                    .sum()
            })
            .collect()
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowFunction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|w| w.name() == lower)
            .or(match lower.as_str() {
                "none" | "rect" => Some(Self::Rectangular),
                "hanning" => Some(Self::Hann),
                _ => None,
            })
            .ok_or_else(|| CoreError::UnknownName {
                kind: "window",
                name: s.to_string(),
            })
    }
}

/// Immutable window weights for one block size.
///
/// The normalization scale `1 / Σ w[n]` is computed on first request and
/// cached. Tables are read-only after construction, so one instance can be
/// shared (e.g. behind an `Arc`) by every consumer of that block size.
///
/// # Example
///
/// ```
/// use specflow_core::window::{WindowCoefficients, WindowFunction};
///
/// let window = WindowCoefficients::new(WindowFunction::Hann, 1024);
/// let input = vec![1.0; 1024];
/// let mut output = vec![0.0; 1024];
/// window.apply(&input, &mut output).unwrap();
/// assert!(output[0].abs() < 1e-12);
/// assert!((window.sum() - 511.5).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct WindowCoefficients {
    function: WindowFunction,
    weights: Vec<f64>,
    scale: OnceLock<f64>,
}

impl WindowCoefficients {
    /// Builds the table for `function` at `size` samples.
    pub fn new(function: WindowFunction, size: usize) -> Self {
        Self {
            function,
            weights: function.coefficients(size),
            scale: OnceLock::new(),
        }
    }

    /// The window this table was built from.
    pub fn function(&self) -> WindowFunction {
        self.function
    }

    /// Number of weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns `true` for a zero-length table.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The weights themselves.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Normalization scale, `1 / sum()`. Zero for an empty table.
    pub fn scale(&self) -> f64 {
        *self.scale.get_or_init(|| {
            let sum = self.sum();
            if sum > 0.0 { 1.0 / sum } else { 0.0 }
        })
    }

    /// Writes `src[i] * w[i]` into `dst[i]` for every weight.
    ///
    /// Extra trailing elements of `src` and `dst` are ignored.
    ///
    /// # Errors
    ///
    /// [`CoreError::BufferTooShort`] if either slice is shorter than the table.
    pub fn apply(&self, src: &[f64], dst: &mut [f64]) -> Result<(), CoreError> {
        let n = self.weights.len();
        let shortest = src.len().min(dst.len());
        if shortest < n {
            return Err(CoreError::BufferTooShort {
                required: n,
                actual: shortest,
            });
        }
        if self.function.is_identity() {
            dst[..n].copy_from_slice(&src[..n]);
            return Ok(());
        }
        for ((d, &s), &w) in dst.iter_mut().zip(src).zip(&self.weights) {
            *d = s * w;
        }
        Ok(())
    }

    /// In-place variant of [`apply`](Self::apply).
    ///
    /// # Errors
    ///
    /// [`CoreError::BufferTooShort`] if `buffer` is shorter than the table.
    pub fn apply_in_place(&self, buffer: &mut [f64]) -> Result<(), CoreError> {
        if buffer.len() < self.weights.len() {
            return Err(CoreError::BufferTooShort {
                required: self.weights.len(),
                actual: buffer.len(),
            });
        }
        if !self.function.is_identity() {
            for (s, &w) in buffer.iter_mut().zip(&self.weights) {
                *s *= w;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_edges_and_center() {
        let w = WindowFunction::Hann.coefficients(101);
        assert!(w[0].abs() < 1e-12);
        assert!(w[100].abs() < 1e-12);
        assert!((w[50] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn windows_are_symmetric() {
        for function in WindowFunction::ALL {
            let w = function.coefficients(64);
            for i in 0..32 {
                assert!(
                    (w[i] - w[63 - i]).abs() < 1e-12,
                    "{function} asymmetric at {i}"
                );
            }
        }
    }

    #[test]
    fn blackman_nuttall_peak_near_one() {
        let w = WindowFunction::BlackmanNuttall.coefficients(1025);
        assert!((w[512] - 1.0).abs() < 1e-6);
        assert!(w[0] < 1e-3);
    }

    #[test]
    fn rectangular_sum_is_size() {
        let table = WindowCoefficients::new(WindowFunction::Rectangular, 2048);
        assert_eq!(table.sum(), 2048.0);
        assert!((table.scale() - 1.0 / 2048.0).abs() < 1e-18);
    }

    #[test]
    fn scale_is_reciprocal_sum() {
        let table = WindowCoefficients::new(WindowFunction::Blackman, 512);
        assert!((table.scale() * table.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tiny_sizes() {
        assert!(WindowFunction::Hann.coefficients(0).is_empty());
        assert_eq!(WindowFunction::Hann.coefficients(1), vec![1.0]);
        assert_eq!(WindowCoefficients::new(WindowFunction::Hann, 0).scale(), 0.0);
    }

    #[test]
    fn apply_rejects_short_buffers() {
        let table = WindowCoefficients::new(WindowFunction::Hann, 8);
        let src = [1.0; 8];
        let mut dst = [0.0; 4];
        assert_eq!(
            table.apply(&src, &mut dst),
            Err(CoreError::BufferTooShort {
                required: 8,
                actual: 4
            })
        );
        let mut short = [1.0; 7];
        assert!(table.apply_in_place(&mut short).is_err());
    }

    #[test]
    fn apply_matches_in_place() {
        let table = WindowCoefficients::new(WindowFunction::Hamming, 16);
        let src: Vec<f64> = (0..16).map(|i| i as f64 * 0.25 - 1.0).collect();
        let mut dst = vec![0.0; 16];
        table.apply(&src, &mut dst).unwrap();
        let mut in_place = src.clone();
        table.apply_in_place(&mut in_place).unwrap();
        assert_eq!(dst, in_place);
    }

    #[test]
    fn parse_names() {
        for function in WindowFunction::ALL {
            assert_eq!(function.name().parse::<WindowFunction>().unwrap(), function);
        }
        assert_eq!(
            "Blackman_Nuttall".parse::<WindowFunction>().unwrap(),
            WindowFunction::BlackmanNuttall
        );
        assert_eq!("none".parse::<WindowFunction>().unwrap(), WindowFunction::Rectangular);
        assert!("kaiser".parse::<WindowFunction>().is_err());
    }
}
