//! Property-based tests for specflow-core primitives.
//!
//! Covers fast-math error bounds, window table invariants, and perceptual
//! scale inversion using proptest for randomized inputs.

use proptest::prelude::*;
use specflow_core::{
    FrequencyScale, WindowCoefficients, WindowFunction, fast_log2, fast_sqrt, fast_sqrtf,
};

fn any_window() -> impl Strategy<Value = WindowFunction> {
    (0usize..WindowFunction::ALL.len()).prop_map(|i| WindowFunction::ALL[i])
}

fn any_scale() -> impl Strategy<Value = FrequencyScale> {
    (0usize..FrequencyScale::ALL.len()).prop_map(|i| FrequencyScale::ALL[i])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// fast_log2 stays within 1e-4 of the exact logarithm across the range
    /// magnitudes actually take (silence floor to heavy clipping).
    #[test]
    fn fast_log2_error_bound(x in 1e-12f64..1e6f64) {
        let err = (fast_log2(x) - x.log2()).abs();
        prop_assert!(err < 1e-4, "fast_log2({}) error {:e}", x, err);
    }

    /// fast_sqrt relative error stays below 0.1%.
    #[test]
    fn fast_sqrt_error_bound(x in 1e-9f64..1e9f64) {
        let rel = (fast_sqrt(x) - x.sqrt()).abs() / x.sqrt();
        prop_assert!(rel < 1e-3, "fast_sqrt({}) relative error {:e}", x, rel);
    }

    /// Single-precision variant obeys the same bound.
    #[test]
    fn fast_sqrtf_error_bound(x in 1e-6f32..1e6f32) {
        let rel = (fast_sqrtf(x) - x.sqrt()).abs() / x.sqrt();
        prop_assert!(rel < 1e-3, "fast_sqrtf({}) relative error {:e}", x, rel);
    }

    /// Every window weight lies in [-0.01, 1] and the scale inverts the sum.
    #[test]
    fn window_weights_bounded(function in any_window(), size in 3usize..4096) {
        let table = WindowCoefficients::new(function, size);
        prop_assert_eq!(table.len(), size);
        for &w in table.weights() {
            prop_assert!((-0.01..=1.0 + 1e-9).contains(&w), "{} weight {} out of range", function, w);
        }
        prop_assert!((table.scale() * table.sum() - 1.0).abs() < 1e-9);
    }

    /// Windowing a constant signal reproduces the weights scaled by that constant.
    #[test]
    fn window_apply_scales_weights(function in any_window(), size in 1usize..512, level in -2.0f64..2.0) {
        let table = WindowCoefficients::new(function, size);
        let src = vec![level; size];
        let mut dst = vec![0.0; size];
        table.apply(&src, &mut dst).unwrap();
        for (d, w) in dst.iter().zip(table.weights()) {
            prop_assert!((d - level * w).abs() < 1e-12);
        }
    }

    /// from_perceptual inverts to_perceptual over the audible band.
    #[test]
    fn scale_round_trip(scale in any_scale(), f in 1.0f64..24_000.0) {
        let back = scale.from_perceptual(scale.to_perceptual(f));
        prop_assert!((back - f).abs() / f < 1e-9, "{} at {}: {}", scale, f, back);
    }

    /// Perceptual mappings preserve ordering.
    #[test]
    fn scale_monotonic(scale in any_scale(), a in 1.0f64..24_000.0, b in 1.0f64..24_000.0) {
        prop_assume!((a - b).abs() > 1e-3);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(scale.to_perceptual(lo) < scale.to_perceptual(hi));
    }
}
