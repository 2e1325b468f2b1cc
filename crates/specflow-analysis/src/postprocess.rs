//! Spectral post-processing: magnitudes, decibels, cropping, perceptual remap.
//!
//! Everything here works on the single-sided half of a real-input transform,
//! `block_size / 2 + 1` bins from DC to Nyquist.
//!
//! Typical display chain for one channel:
//!
//! 1. [`magnitudes`] with the window used for the block
//! 2. [`crop`] to the displayed frequency range
//! 3. [`to_db`] in place
//! 4. [`FrequencyRemapper::remap`] onto the display width

use std::ops::Range;

use rustfft::num_complex::Complex;
use specflow_core::fast_math::{LOG2_E, fast_log2};
use specflow_core::{FrequencyScale, WindowCoefficients};

use crate::error::{AnalysisError, Result};
use crate::transform::FftSample;

/// `20 / ln(10)`: natural log to decibels.
pub const LOG_TO_DB: f64 = 8.685_889_638_065_037;

/// Number of independent bins for a real transform of `block_size` points.
#[inline]
pub fn complex_count(block_size: usize) -> usize {
    block_size / 2 + 1
}

/// Center frequency of bin `index` in Hz.
#[inline]
pub fn bin_frequency(index: usize, block_size: usize, sample_rate: u32) -> f64 {
    index as f64 * f64::from(sample_rate) / block_size as f64
}

/// Nearest bin for `frequency`, `round(f * block_size / sample_rate)`.
///
/// Negative frequencies map to bin 0.
#[inline]
pub fn frequency_index(frequency: f64, block_size: usize, sample_rate: u32) -> usize {
    (frequency * block_size as f64 / f64::from(sample_rate))
        .round()
        .max(0.0) as usize
}

/// Bin range `[min, max)` covering `min_frequency..=max_frequency`, clamped
/// to `available` bins.
pub fn crop_range(
    block_size: usize,
    sample_rate: u32,
    min_frequency: f64,
    max_frequency: f64,
    available: usize,
) -> Range<usize> {
    let start = frequency_index(min_frequency, block_size, sample_rate).min(available);
    let end = (frequency_index(max_frequency, block_size, sample_rate) + 1).min(available);
    start..end.max(start)
}

/// Length of [`crop_range`] over a full single-sided spectrum.
pub fn cropped_len(block_size: usize, sample_rate: u32, min_frequency: f64, max_frequency: f64) -> usize {
    crop_range(
        block_size,
        sample_rate,
        min_frequency,
        max_frequency,
        complex_count(block_size),
    )
    .len()
}

/// Copies the bins of `src` inside the frequency range into `dst`.
///
/// Returns the number of bins written.
///
/// # Errors
///
/// [`AnalysisError::BufferTooShort`] if `dst` cannot hold the range.
pub fn crop<T: Copy>(
    block_size: usize,
    sample_rate: u32,
    min_frequency: f64,
    max_frequency: f64,
    src: &[T],
    dst: &mut [T],
) -> Result<usize> {
    let range = crop_range(block_size, sample_rate, min_frequency, max_frequency, src.len());
    let len = range.len();
    if dst.len() < len {
        return Err(AnalysisError::buffer_too_short(len, dst.len()));
    }
    dst[..len].copy_from_slice(&src[range]);
    Ok(len)
}

/// Whether [`magnitudes`] takes the square root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrumMode {
    /// `|X|`, amplitude.
    #[default]
    Magnitude,
    /// `|X|²`, power.
    Power,
}

/// Single-sided, window-normalized magnitudes of a complex spectrum.
///
/// Bin 0 is scaled by `1 / Σw`, every other bin by `2 / Σw`, where `Σw` is
/// the window's coefficient sum or `block_size` when no window was applied.
/// A full-scale sine centered on a bin therefore reads 1.0.
///
/// # Errors
///
/// [`AnalysisError::BufferTooShort`] if `src` or `dst` has fewer than
/// `block_size / 2 + 1` elements.
pub fn magnitudes<T: FftSample>(
    block_size: usize,
    src: &[Complex<T>],
    dst: &mut [f64],
    mode: SpectrumMode,
    window: Option<&WindowCoefficients>,
) -> Result<()> {
    let n = complex_count(block_size);
    let shortest = src.len().min(dst.len());
    if shortest < n {
        return Err(AnalysisError::buffer_too_short(n, shortest));
    }

    let scale0 = window.map_or(1.0 / block_size as f64, WindowCoefficients::scale);
    let scale = 2.0 * scale0;
    for (i, (out, c)) in dst[..n].iter_mut().zip(&src[..n]).enumerate() {
        let (re, im) = (c.re.as_f64(), c.im.as_f64());
        let power = re * re + im * im;
        let value = match mode {
            SpectrumMode::Magnitude => power.sqrt(),
            SpectrumMode::Power => power,
        };
        *out = value * if i == 0 { scale0 } else { scale };
    }
    Ok(())
}

/// Exact decibel compression of one value onto `[0, ∞)`.
///
/// `max(0, 20·log10(x) / max_db + 1)`: `max_db` below full scale maps to 0,
/// full scale maps to 1.
#[inline]
pub fn db(x: f64, max_db: f64) -> f64 {
    (x.ln() * LOG_TO_DB / max_db + 1.0).max(0.0)
}

/// In-place [`db`] using the table logarithm.
pub fn to_db(data: &mut [f64], max_db: f64) {
    let scale = LOG_TO_DB / LOG2_E / max_db;
    for x in data.iter_mut() {
        *x = (fast_log2(*x) * scale + 1.0).max(0.0);
    }
}

/// Multiplies every element by `factor`.
pub fn scale(data: &mut [f64], factor: f64) {
    for x in data.iter_mut() {
        *x *= factor;
    }
}

/// Absolute threshold of hearing in dB SPL (Terhardt), `f` in Hz.
fn threshold_of_hearing(frequency: f64) -> f64 {
    let f = frequency / 1000.0;
    3.64 * f.powf(-0.8) - 6.5 * (-0.6 * (f - 3.3) * (f - 3.3)).exp() + 0.001 * (f * f) * (f * f)
}

/// Threshold of hearing for every bin; bin 0 (DC) is `+∞`.
pub fn hearing_threshold(block_size: usize, sample_rate: u32) -> Vec<f64> {
    (0..complex_count(block_size))
        .map(|i| {
            if i == 0 {
                f64::INFINITY
            } else {
                threshold_of_hearing(bin_frequency(i, block_size, sample_rate))
            }
        })
        .collect()
}

/// Decibels above the threshold of hearing, `max(20·log10(x) - t + max_db, 0)`.
///
/// `threshold` must be aligned with `data`: crop both with the same range.
///
/// # Errors
///
/// [`AnalysisError::BufferTooShort`] if `threshold` is shorter than `data`.
pub fn to_db_above_threshold(threshold: &[f64], data: &mut [f64], max_db: f64) -> Result<()> {
    if threshold.len() < data.len() {
        return Err(AnalysisError::buffer_too_short(data.len(), threshold.len()));
    }
    for (x, &t) in data.iter_mut().zip(threshold) {
        *x = (x.ln() * LOG_TO_DB - t + max_db).max(0.0);
    }
    Ok(())
}

/// Linear interpolation at a fractional index, clamped to the ends.
#[inline]
fn interpolate(data: &[f64], index: f64) -> f64 {
    let last = data.len() - 1;
    if index <= 0.0 {
        return data[0];
    }
    if index >= last as f64 {
        return data[last];
    }
    let floor = index.floor();
    let lo = floor as usize;
    let hi = index.ceil() as usize;
    (data[hi] - data[lo]) * (index - floor) + data[lo]
}

/// Maximum of `data` over the fractional interval `[start, end]`.
///
/// Endpoints are interpolated; whole bins strictly inside are exact.
fn bucket_max(data: &[f64], start: f64, end: f64) -> f64 {
    let first = start.ceil().max(0.0) as usize;
    let last = (end.floor().max(0.0) as usize).min(data.len() - 1);
    let inner = data
        .iter()
        .take(last + 1)
        .skip(first)
        .fold(interpolate(data, start), |m, &v| m.max(v));
    inner.max(interpolate(data, end))
}

#[derive(Debug, Clone)]
struct RemapCache {
    scale: FrequencyScale,
    src_width: usize,
    dst_width: usize,
    min_frequency: f64,
    max_frequency: f64,
    bounds: Vec<f64>,
}

impl RemapCache {
    fn matches(
        &self,
        scale: FrequencyScale,
        src_width: usize,
        dst_width: usize,
        min_frequency: f64,
        max_frequency: f64,
    ) -> bool {
        self.scale == scale
            && self.src_width == src_width
            && self.dst_width == dst_width
            && self.min_frequency == min_frequency
            && self.max_frequency == max_frequency
    }

    fn build(
        scale: FrequencyScale,
        src_width: usize,
        dst_width: usize,
        min_frequency: f64,
        max_frequency: f64,
    ) -> Self {
        let index_per_hz = (src_width - 1) as f64 / (max_frequency - min_frequency);
        let min_p = scale.to_perceptual(min_frequency);
        let step = (scale.to_perceptual(max_frequency) - min_p) / dst_width as f64;
        let bounds = (0..=dst_width)
            .map(|i| (scale.from_perceptual(i as f64 * step + min_p) - min_frequency) * index_per_hz)
            .collect();
        Self {
            scale,
            src_width,
            dst_width,
            min_frequency,
            max_frequency,
            bounds,
        }
    }
}

/// Resamples linear-frequency spectra onto a perceptual axis.
///
/// Destination buckets are uniform in perceptual units. Each bucket takes
/// the maximum of the source over its interval, so narrow peaks survive when
/// many high-frequency bins fold into one bucket.
///
/// Bucket boundaries are cached per (scale, source width, destination width,
/// frequency range) and rebuilt only when one of them changes.
///
/// # Example
///
/// ```
/// use specflow_analysis::postprocess::FrequencyRemapper;
/// use specflow_core::FrequencyScale;
///
/// let src: Vec<f64> = (0..100).map(|i| if i == 10 { 1.0 } else { 0.0 }).collect();
/// let mut dst = vec![0.0; 20];
/// let mut remapper = FrequencyRemapper::new();
/// remapper
///     .remap(&src, 100.0, 10_000.0, &mut dst, FrequencyScale::Linear)
///     .unwrap();
/// assert_eq!(dst.iter().cloned().fold(0.0, f64::max), 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrequencyRemapper {
    cache: Option<RemapCache>,
}

impl FrequencyRemapper {
    /// Creates a remapper with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached source-index boundaries (`dst_width + 1` values), if built.
    pub fn bounds(&self) -> Option<&[f64]> {
        self.cache.as_ref().map(|c| c.bounds.as_slice())
    }

    /// Remaps `src`, spanning `min_frequency..=max_frequency` linearly, onto
    /// `dst` with buckets uniform in `scale`.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::InvalidFrequencyRange`] if `min >= max`, or the scale
    ///   needs positive frequencies and `min <= 0`
    /// - [`AnalysisError::BufferTooShort`] if `src` is empty and `dst` is not
    pub fn remap(
        &mut self,
        src: &[f64],
        min_frequency: f64,
        max_frequency: f64,
        dst: &mut [f64],
        scale: FrequencyScale,
    ) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if src.is_empty() {
            return Err(AnalysisError::buffer_too_short(1, 0));
        }
        let positive_ok = !scale.requires_positive() || min_frequency > 0.0;
        if !(min_frequency < max_frequency) || !positive_ok {
            return Err(AnalysisError::InvalidFrequencyRange {
                min: min_frequency,
                max: max_frequency,
                nyquist: f64::NAN,
            });
        }

        let (src_width, dst_width) = (src.len(), dst.len());
        let fresh = self
            .cache
            .as_ref()
            .is_some_and(|c| c.matches(scale, src_width, dst_width, min_frequency, max_frequency));
        if !fresh {
            self.cache = Some(RemapCache::build(
                scale,
                src_width,
                dst_width,
                min_frequency,
                max_frequency,
            ));
        }
        let Some(cache) = self.cache.as_ref() else {
            return Ok(());
        };

        for (out, edge) in dst.iter_mut().zip(cache.bounds.windows(2)) {
            *out = bucket_max(src, edge[0], edge[1]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specflow_core::WindowFunction;
    use std::f64::consts::PI;

    #[test]
    fn bin_helpers() {
        assert_eq!(complex_count(2048), 1025);
        assert_eq!(frequency_index(1000.0, 2048, 48_000), 43);
        assert_eq!(frequency_index(-5.0, 2048, 48_000), 0);
        assert!((bin_frequency(43, 2048, 48_000) - 1007.8125).abs() < 1e-9);
    }

    #[test]
    fn crop_range_clamps() {
        assert_eq!(crop_range(2048, 48_000, 50.0, 20_000.0, 1025), 2..854);
        assert_eq!(crop_range(2048, 48_000, 0.0, 30_000.0, 1025), 0..1025);
        assert_eq!(cropped_len(2048, 48_000, 50.0, 20_000.0), 852);
        // Range entirely above the available bins collapses to empty.
        assert!(crop_range(2048, 48_000, 30_000.0, 40_000.0, 1025).is_empty());
    }

    #[test]
    fn crop_copies_and_rejects_short_dst() {
        let src: Vec<u32> = (0..9).collect();
        let mut dst = [0u32; 4];
        // 16-point block at 16 Hz: bin width 1 Hz
        let n = crop(16, 16, 2.0, 5.0, &src, &mut dst).unwrap();
        assert_eq!(n, 4);
        assert_eq!(dst, [2, 3, 4, 5]);

        let mut small = [0u32; 3];
        assert!(matches!(
            crop(16, 16, 2.0, 5.0, &src, &mut small),
            Err(AnalysisError::BufferTooShort {
                required: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn magnitude_normalization_without_window() {
        let n = 64;
        let mut spectrum = vec![Complex::new(0.0f64, 0.0); 33];
        spectrum[0] = Complex::new(64.0, 0.0);
        spectrum[5] = Complex::new(0.0, -32.0);
        let mut out = vec![0.0; 33];
        magnitudes(n, &spectrum, &mut out, SpectrumMode::Magnitude, None).unwrap();
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!((out[5] - 1.0).abs() < 1e-12);

        magnitudes(n, &spectrum, &mut out, SpectrumMode::Power, None).unwrap();
        assert!((out[5] - 32.0 * 32.0 * 2.0 / 64.0).abs() < 1e-9);
    }

    #[test]
    fn magnitude_uses_window_scale() {
        let n = 32;
        let window = WindowCoefficients::new(WindowFunction::Hann, n);
        let spectrum = vec![Complex::new(1.0f32, 0.0); 17];
        let mut out = vec![0.0; 17];
        magnitudes(n, &spectrum, &mut out, SpectrumMode::Magnitude, Some(&window)).unwrap();
        assert!((out[0] - window.scale()).abs() < 1e-9);
        assert!((out[1] - 2.0 * window.scale()).abs() < 1e-9);
    }

    #[test]
    fn magnitude_rejects_short_buffers() {
        let spectrum = vec![Complex::new(0.0f64, 0.0); 10];
        let mut out = vec![0.0; 17];
        assert!(magnitudes(32, &spectrum, &mut out, SpectrumMode::Magnitude, None).is_err());
    }

    #[test]
    fn db_reference_points() {
        assert!((db(1.0, 130.0) - 1.0).abs() < 1e-12);
        // -65 dB is halfway down a 130 dB range.
        assert!((db(10f64.powf(-65.0 / 20.0), 130.0) - 0.5).abs() < 1e-12);
        assert_eq!(db(1e-9, 60.0), 0.0);
    }

    #[test]
    fn table_db_tracks_exact_db() {
        let mut data: Vec<f64> = (1..2000).map(|i| i as f64 * 5e-4).collect();
        let exact: Vec<f64> = data.iter().map(|&x| db(x, 100.0)).collect();
        to_db(&mut data, 100.0);
        for (a, b) in data.iter().zip(&exact) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn to_db_floors_silence() {
        let mut data = vec![0.0, 1e-300, 1.0];
        to_db(&mut data, 130.0);
        assert_eq!(&data[..2], &[0.0, 0.0]);
        assert!((data[2] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn threshold_shape() {
        let t = hearing_threshold(4096, 48_000);
        assert_eq!(t.len(), 2049);
        assert!(t[0].is_infinite());
        // The ear is most sensitive near 3-4 kHz: threshold dips below 0 dB.
        let k = frequency_index(3300.0, 4096, 48_000);
        assert!(t[k] < 0.0);
        assert!(t[1] > t[k]);
    }

    #[test]
    fn db_above_threshold() {
        let threshold = vec![f64::INFINITY, 10.0, 0.0];
        let mut data = vec![1.0, 1.0, 0.1];
        to_db_above_threshold(&threshold, &mut data, 60.0).unwrap();
        assert_eq!(data[0], 0.0);
        assert!((data[1] - 50.0).abs() < 1e-9);
        assert!((data[2] - 40.0).abs() < 1e-9);
        assert!(to_db_above_threshold(&threshold[..1], &mut data, 60.0).is_err());
    }

    #[test]
    fn remap_linear_keeps_isolated_peak() {
        let mut src = vec![0.0; 1000];
        src[777] = 0.9;
        let mut dst = vec![0.0; 64];
        FrequencyRemapper::new()
            .remap(&src, 0.0, 999.0, &mut dst, FrequencyScale::Linear)
            .unwrap();
        let peaks: Vec<usize> = (0..64).filter(|&i| dst[i] == 0.9).collect();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0], 777 * 64 / 999);
    }

    #[test]
    fn remap_interpolates_when_upsampling() {
        let src = vec![0.0, 1.0];
        let mut dst = vec![0.0; 4];
        FrequencyRemapper::new()
            .remap(&src, 10.0, 20.0, &mut dst, FrequencyScale::Linear)
            .unwrap();
        // Bucket i covers [i/4, (i+1)/4]; max is the interpolated right edge.
        for (i, v) in dst.iter().enumerate() {
            assert!((v - (i + 1) as f64 / 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn decade_bounds_are_log_spaced() {
        // 1 Hz per bin from 10 Hz: src index = f - 10.
        let src = vec![0.0; 991];
        let mut dst = vec![0.0; 2];
        let mut remapper = FrequencyRemapper::new();
        remapper
            .remap(&src, 10.0, 1000.0, &mut dst, FrequencyScale::Decade)
            .unwrap();
        let bounds = remapper.bounds().unwrap();
        assert!(bounds[0].abs() < 1e-9);
        assert!((bounds[1] - 90.0).abs() < 1e-9);
        assert!((bounds[2] - 990.0).abs() < 1e-6);
    }

    #[test]
    fn cache_rebuilds_on_change() {
        let src = vec![0.5; 100];
        let mut dst = vec![0.0; 10];
        let mut remapper = FrequencyRemapper::new();
        remapper.remap(&src, 50.0, 5000.0, &mut dst, FrequencyScale::Mel).unwrap();
        let mel = remapper.bounds().unwrap().to_vec();
        remapper.remap(&src, 50.0, 5000.0, &mut dst, FrequencyScale::Mel).unwrap();
        assert_eq!(remapper.bounds().unwrap(), mel.as_slice());

        remapper.remap(&src, 50.0, 5000.0, &mut dst, FrequencyScale::Cochlear).unwrap();
        assert_ne!(remapper.bounds().unwrap(), mel.as_slice());

        let mut wider = vec![0.0; 20];
        remapper.remap(&src, 50.0, 5000.0, &mut wider, FrequencyScale::Cochlear).unwrap();
        assert_eq!(remapper.bounds().unwrap().len(), 21);
        assert!(wider.iter().all(|&v| (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn remap_rejects_bad_ranges() {
        let src = vec![0.0; 10];
        let mut dst = vec![0.0; 4];
        let mut remapper = FrequencyRemapper::new();
        assert!(remapper.remap(&src, 100.0, 100.0, &mut dst, FrequencyScale::Linear).is_err());
        assert!(remapper.remap(&src, 0.0, 100.0, &mut dst, FrequencyScale::Decade).is_err());
        assert!(remapper.remap(&[], 1.0, 100.0, &mut dst, FrequencyScale::Decade).is_err());
        assert!(remapper.remap(&src, 0.0, 100.0, &mut [], FrequencyScale::Decade).is_ok());
    }

    #[test]
    fn windowed_sine_reads_unit_amplitude() {
        // Bin-centered sine: the window-normalized peak is the amplitude.
        let n = 1024;
        let window = WindowCoefficients::new(WindowFunction::Hann, n);
        let samples: Vec<f64> = (0..n)
            .map(|i| 0.5 * (2.0 * PI * 64.0 * i as f64 / n as f64).sin())
            .collect();
        let mut windowed = vec![0.0; n];
        window.apply(&samples, &mut windowed).unwrap();

        // Direct DFT of bin 64 is enough here.
        let (mut re, mut im) = (0.0, 0.0);
        for (i, &x) in windowed.iter().enumerate() {
            let phase = -2.0 * PI * 64.0 * i as f64 / n as f64;
            re += x * phase.cos();
            im += x * phase.sin();
        }
        let mut spectrum = vec![Complex::new(0.0f64, 0.0); n / 2 + 1];
        spectrum[64] = Complex::new(re, im);
        let mut out = vec![0.0; n / 2 + 1];
        magnitudes(n, &spectrum, &mut out, SpectrumMode::Magnitude, Some(&window)).unwrap();
        assert!((out[64] - 0.5).abs() < 2e-3, "peak {}", out[64]);
    }
}
